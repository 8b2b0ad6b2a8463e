//! Integration tests: a sender and a receiver talking through in-memory
//! screens, checking the file arrives byte for byte.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camlink_protocol::memory::{MemorySink, MemorySource, RecordingDisplay, ScriptedScanner, SharedScreen};
use camlink_protocol::{
    CancelToken, NoDelay, NullLogger, Phase, ReceiverConfig, SenderConfig, ThreadPacer, TracingLogger,
    TransferProgress, VisualLink, build_acknowledgment, encode, run_receiver, run_sender,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("camlink_protocol=debug")
        .try_init();
}

fn ack(id: u64) -> String {
    encode(&build_acknowledgment(id)).unwrap()
}

/// Sender runs against scripted acknowledgments; the receiver is then fed
/// exactly the texts the sender put on screen.
#[test]
fn scripted_hi_txt_transfer() {
    init_logging();
    let content = b"hello world!".to_vec();
    assert_eq!(content.len(), 12);

    let scanner = ScriptedScanner::from_texts([ack(0), ack(1), ack(2), ack(3)]);
    let mut sender_link = VisualLink::new(scanner, RecordingDisplay::new(), NoDelay::default(), CancelToken::new());
    let sender_config = SenderConfig {
        chunk_size: 5,
        logger: Some(Arc::new(TracingLogger)),
    };
    let mut source = MemorySource::new("hi.txt", content.clone());
    let report = run_sender(&sender_config, &mut source, &mut sender_link, &TransferProgress::new()).unwrap();
    assert_eq!(report.total_chunks, 3);

    let (_, display, _) = sender_link.into_parts();
    let shown: Vec<String> = display.shown().iter().map(|(_, text)| text.clone()).collect();
    assert_eq!(shown.len(), 4);

    let mut receiver_link = VisualLink::new(
        ScriptedScanner::from_texts(shown),
        RecordingDisplay::new(),
        NoDelay::default(),
        CancelToken::new(),
    );
    let receiver_config = ReceiverConfig {
        ack_linger: Duration::ZERO,
        logger: Some(Arc::new(TracingLogger)),
    };
    let mut sink = MemorySink::new("/downloads");
    let progress = TransferProgress::new();
    let received = run_receiver(&receiver_config, &mut sink, &mut receiver_link, &progress).unwrap();

    assert_eq!(received.total_chunks, 3);
    assert_eq!(received.file_name, "hi.txt");
    assert_eq!(received.path, std::path::PathBuf::from("/downloads/hi.txt"));
    assert_eq!(sink.saved()[0].bytes, content);
    assert_eq!(progress.phase(), Phase::Complete);

    let (_, receiver_display, _) = receiver_link.into_parts();
    let acks: Vec<String> = receiver_display.shown().iter().map(|(_, text)| text.clone()).collect();
    assert_eq!(acks, vec![ack(0), ack(1), ack(2), ack(3)]);
}

/// The receiver's camera sees every frame several times with noise in
/// between, the way a real camera re-reads a QR code still on screen.
#[test]
fn noisy_channel_still_reconstructs() {
    init_logging();
    let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let chunks = camlink_protocol::build_chunks("noise.bin", &content);
    let mut frames = Vec::new();
    for chunk in &chunks {
        let text = encode(chunk).unwrap();
        frames.push(Some(text.clone()));
        frames.push(None);
        frames.push(Some("https://example.com/unrelated-qr".to_string()));
        frames.push(Some(ack(chunk.id())));
        frames.push(Some(text));
    }

    let mut link = VisualLink::new(
        ScriptedScanner::new(frames),
        RecordingDisplay::new(),
        NoDelay::default(),
        CancelToken::new(),
    );
    let config = ReceiverConfig {
        ack_linger: Duration::ZERO,
        logger: Some(Arc::new(NullLogger)),
    };
    let mut sink = MemorySink::new("/tmp");
    let report = run_receiver(&config, &mut sink, &mut link, &TransferProgress::new()).unwrap();

    assert_eq!(report.total_chunks, 10);
    assert_eq!(sink.saved()[0].bytes, content);
    let (_, display, _) = link.into_parts();
    assert_eq!(display.shown().len(), chunks.len());
}

/// Both roles on their own thread, each watching the other's screen.
#[test]
fn threaded_loopback_transfer() {
    init_logging();
    let content: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();

    let sender_screen = SharedScreen::new();
    let receiver_screen = SharedScreen::new();
    let cancel = CancelToken::new();

    let receiver_handle = {
        let link = VisualLink::new(sender_screen.clone(), receiver_screen.clone(), ThreadPacer, cancel.clone())
            .with_poll_interval(Duration::from_millis(1));
        thread::spawn(move || {
            let mut link = link;
            let config = ReceiverConfig {
                ack_linger: Duration::from_millis(50),
                logger: None,
            };
            let mut sink = MemorySink::new("/inbox");
            let report = run_receiver(&config, &mut sink, &mut link, &TransferProgress::new());
            (report, sink)
        })
    };

    let sender_handle = {
        let link = VisualLink::new(receiver_screen, sender_screen, ThreadPacer, cancel.clone())
            .with_poll_interval(Duration::from_millis(1));
        let content = content.clone();
        thread::spawn(move || {
            let mut link = link;
            let config = SenderConfig {
                chunk_size: 64,
                logger: None,
            };
            let mut source = MemorySource::new("pattern.bin", content);
            run_sender(&config, &mut source, &mut link, &TransferProgress::new())
        })
    };

    // Watchdog so a protocol bug fails the test instead of hanging it.
    let watchdog = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            for _ in 0..300 {
                if cancel.is_cancelled() {
                    return;
                }
                thread::sleep(Duration::from_millis(100));
            }
            cancel.cancel();
        })
    };

    let sent = sender_handle.join().expect("sender thread panicked").unwrap();
    let (received, sink) = receiver_handle.join().expect("receiver thread panicked");
    let received = received.unwrap();
    cancel.cancel();
    watchdog.join().unwrap();

    assert_eq!(sent.total_chunks, 32);
    assert_eq!(received.total_chunks, 32);
    assert_eq!(sink.saved()[0].bytes, content);
}
