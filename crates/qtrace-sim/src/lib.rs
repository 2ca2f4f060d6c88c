pub mod capture;
pub mod connection;
pub mod script;

pub use capture::ScriptedCapture;
pub use connection::{SimConnection, SimPacket};
pub use script::{run_script, ScriptRun, Step};

#[cfg(test)]
mod tests {
    use super::*;
    use qtrace_core::{Direction, FixedRevision, TlsSecrets};

    #[test]
    fn script_records_and_completes() {
        let secrets = TlsSecrets {
            client_random: vec![1; 32],
            exporter_secret: vec![2; 32],
            early_exporter_secret: vec![3; 32],
        };
        let steps = [
            Step::send(b"initial".to_vec()),
            Step::receive(b"handshake".to_vec()),
            Step::Handshake(secrets.clone()),
            Step::Retransmit(0),
            Step::mark_error(5, "retransmitted initial", Some(3)),
        ];

        let run = run_script(
            "retransmission",
            1,
            "quic.example.org",
            &FixedRevision::new("abc123"),
            &steps,
        )
        .expect("script failed");

        let packets = run.trace.packets();
        let directions: Vec<Direction> = packets.iter().map(|p| p.direction).collect();
        assert_eq!(
            directions,
            vec![Direction::ToServer, Direction::ToClient, Direction::ToServer]
        );
        // The retransmission shares its key with step 0, which was captured first.
        let flags: Vec<bool> = packets.iter().map(|p| p.is_of_interest).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(run.trace.error_code, 5);
        assert_eq!(run.trace.client_random, secrets.client_random);
        assert!(run.packets[2].is_none());
    }

    #[test]
    fn script_rejects_forward_reference() {
        let steps = [Step::mark_error(1, "", Some(4))];
        let err = run_script("bad", 1, "h", &FixedRevision::new("abc"), &steps).unwrap_err();
        assert!(err.to_string().contains("has not run yet"));
    }

    #[test]
    fn script_surfaces_missing_provenance() {
        let err = run_script("s", 1, "h", &FixedRevision::new(""), &[]).unwrap_err();
        let trace_err = err
            .downcast_ref::<qtrace_core::TraceError>()
            .expect("TraceError in chain");
        assert!(trace_err.is_fatal());
    }
}
