//! Send and receive paths firing hooks from separate threads.

use qtrace_core::{Direction, FixedRevision, Trace};
use qtrace_sim::SimConnection;
use std::sync::{Arc, Barrier};
use std::thread;

const PER_DIRECTION: usize = 500;

/// Reader and writer threads append concurrently → nothing lost,
/// and each direction keeps its own order.
#[test]
fn concurrent_directions_lose_nothing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let conn = Arc::new(SimConnection::new());
    let trace = Trace::new("stress", 1, "localhost", &FixedRevision::new("feed")).unwrap();
    trace.attach_to(&*conn);

    let barrier = Arc::new(Barrier::new(2));

    let c1 = conn.clone();
    let b1 = barrier.clone();
    let writer = thread::spawn(move || {
        b1.wait();
        for i in 0..PER_DIRECTION {
            c1.send((i as u32).to_be_bytes().to_vec());
        }
    });

    let c2 = conn.clone();
    let b2 = barrier.clone();
    let reader = thread::spawn(move || {
        b2.wait();
        for i in 0..PER_DIRECTION {
            c2.receive((i as u32).to_be_bytes().to_vec());
        }
    });

    writer.join().unwrap();
    reader.join().unwrap();

    let packets = trace.packets();
    assert_eq!(packets.len(), 2 * PER_DIRECTION);

    for direction in [Direction::ToServer, Direction::ToClient] {
        let seq: Vec<u32> = packets
            .iter()
            .filter(|p| p.direction == direction)
            .map(|p| u32::from_be_bytes(p.data[..4].try_into().unwrap()))
            .collect();
        let expected: Vec<u32> = (0..PER_DIRECTION as u32).collect();
        assert_eq!(seq, expected, "{direction} packets out of order");
    }

    assert!(
        packets.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "timestamps must follow stream order"
    );
}

/// A verdict marked while hooks are still firing flags exactly one packet.
#[test]
fn mark_error_during_capture() {
    let conn = Arc::new(SimConnection::new());
    let mut trace = Trace::new("stress", 1, "localhost", &FixedRevision::new("feed")).unwrap();
    trace.attach_to(&*conn);

    let target = conn.send(b"target".to_vec());

    let c = conn.clone();
    let background = thread::spawn(move || {
        for _ in 0..200 {
            c.receive(b"noise".to_vec());
        }
    });

    trace.mark_error(9, "flagged while busy", Some(&target));
    background.join().unwrap();

    let of_interest = trace.packets_of_interest();
    assert_eq!(of_interest.len(), 1);
    assert_eq!(of_interest[0].data, b"target");
    assert_eq!(trace.stream_len(), 201);
}
