//! Simulator tests

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tagwatch_protocol::BeaconParser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::simulator::{Output, SimulatorOptions, TagSimulator, timestamp_now};

fn fast_options(output: Output) -> SimulatorOptions {
    SimulatorOptions {
        min_interval: Duration::ZERO,
        max_interval: Duration::ZERO,
        output,
        ..Default::default()
    }
}

#[test]
fn test_rejects_too_few_tags() {
    let err = TagSimulator::new(SimulatorOptions {
        tags: vec!["aaaaaaaa".into(), "bbbbbbbb".into()],
        ..Default::default()
    })
    .err()
    .unwrap();

    assert!(matches!(err, ClientError::TooFewTags { min: 3, got: 2 }));
}

#[test]
fn test_rejects_bad_options() {
    let empty_tag = SimulatorOptions {
        tags: vec!["aaaaaaaa".into(), "".into(), "cccccccc".into()],
        ..Default::default()
    };
    assert!(TagSimulator::new(empty_tag).is_err());

    let inverted = SimulatorOptions {
        min_interval: Duration::from_secs(5),
        max_interval: Duration::from_secs(1),
        ..Default::default()
    };
    assert!(TagSimulator::new(inverted).is_err());

    let ratio = SimulatorOptions {
        malformed_ratio: 1.5,
        ..Default::default()
    };
    assert!(TagSimulator::new(ratio).is_err());
}

#[test]
fn test_lines_parse_and_counters_advance() {
    let sim = TagSimulator::new(SimulatorOptions::default()).unwrap();
    let parser = BeaconParser::strict();
    let mut rng = StdRng::seed_from_u64(7);

    let mut last = std::collections::HashMap::new();
    for _ in 0..50 {
        let line = sim.next_line(&mut rng);
        let beacon = parser.parse(&line).unwrap();

        let previous = last.insert(beacon.tag_id.clone(), beacon.cnt).unwrap_or(0);
        assert_eq!(beacon.cnt, previous + 1, "counter skipped in {line}");
    }

    let status = sim.status();
    assert_eq!(status.counters.values().sum::<u64>(), 50);
    assert_eq!(status.counters.len(), 3);
    assert_eq!(status.malformed, 0);
}

#[test]
fn test_malformed_lines_rejected() {
    let sim = TagSimulator::new(SimulatorOptions {
        malformed_ratio: 1.0,
        ..Default::default()
    })
    .unwrap();
    let parser = BeaconParser::strict();
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..50 {
        let line = sim.next_line(&mut rng);
        assert!(parser.parse(&line).is_err(), "accepted {line}");
    }

    let status = sim.status();
    assert_eq!(status.malformed, 50);
    assert!(status.counters.values().all(|&c| c == 0));
}

#[test]
fn test_interval_bounds() {
    let sim = TagSimulator::new(SimulatorOptions {
        min_interval: Duration::from_millis(100),
        max_interval: Duration::from_millis(300),
        ..Default::default()
    })
    .unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..100 {
        let pause = sim.next_interval(&mut rng);
        assert!(pause >= Duration::from_millis(100));
        assert!(pause <= Duration::from_millis(300));
    }

    let fixed = TagSimulator::new(fast_options(Output::Stdout)).unwrap();
    assert_eq!(fixed.next_interval(&mut rng), Duration::ZERO);
}

#[test]
fn test_timestamp_format() {
    let ts = timestamp_now();
    assert_eq!(ts.len(), 18);
    assert_eq!(&ts[14..15], ".");
    assert!(
        BeaconParser::strict()
            .parse(&format!("TAG,aaaaaaaa,1,{ts}"))
            .is_ok()
    );
}

#[tokio::test]
async fn test_file_output_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tag_output.log");
    std::fs::write(&path, "existing\n").unwrap();

    let sim = TagSimulator::new(SimulatorOptions {
        count: Some(5),
        ..fast_options(Output::File(path.clone()))
    })
    .unwrap();

    let status = sim.run(CancellationToken::new()).await.unwrap();
    assert_eq!(status.sent, 5);
    assert!(!status.running);
    assert_eq!(status.output, "file");

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "existing");

    let parser = BeaconParser::strict();
    for line in &lines[1..] {
        assert!(parser.parse(line).is_ok(), "bad line {line}");
    }
}

#[tokio::test]
async fn test_socket_output_counts_replies() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        let mut received = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            received += 1;
            write_half.write_all(b"ACK\n").await.unwrap();
        }
        received
    });

    let sim = TagSimulator::new(SimulatorOptions {
        count: Some(4),
        ..fast_options(Output::Socket(addr.clone()))
    })
    .unwrap();

    let status = sim.run(CancellationToken::new()).await.unwrap();
    assert_eq!(status.sent, 4);
    assert_eq!(status.acks, 4);
    assert_eq!(status.nacks, 0);
    assert_eq!(status.target.as_deref(), Some(addr.as_str()));

    assert_eq!(server.await.unwrap(), 4);
}

#[tokio::test]
async fn test_cancelled_before_first_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.log");
    let sim = TagSimulator::new(fast_options(Output::File(path.clone()))).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let status = sim.run(cancel).await.unwrap();
    assert_eq!(status.sent, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[tokio::test]
async fn test_cancel_stops_running_simulator() {
    let dir = tempfile::tempdir().unwrap();
    let sim = std::sync::Arc::new(
        TagSimulator::new(SimulatorOptions {
            min_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(10),
            output: Output::File(dir.path().join("out.log")),
            ..Default::default()
        })
        .unwrap(),
    );

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let sim = sim.clone();
        let cancel = cancel.clone();
        async move { sim.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sim.is_running());
    cancel.cancel();

    let status = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!status.running);
    assert!(status.sent > 0);
}

#[tokio::test]
async fn test_socket_connect_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let sim = TagSimulator::new(fast_options(Output::Socket(addr))).unwrap();
    let err = sim.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
    assert!(!sim.is_running());
}
