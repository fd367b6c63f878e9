use radio_modules::PipelineError;
use radio_modules::config::NetworkConfig;
use radio_modules::now_playing::fetch_playlist;
use radio_modules::source::SampleSource;
use radio_modules::source::stream::{http_client, open_http_stream};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Serves `response` to the first connection, then keeps the socket open
/// until the returned sender is dropped.
fn serve_then_hold(response: Vec<u8>) -> (String, mpsc::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();

    thread::spawn(move || {
        let Ok((mut conn, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            match conn.read(&mut byte) {
                Ok(1) => request.push(byte[0]),
                _ => return,
            }
        }
        if conn.write_all(&response).and_then(|_| conn.flush()).is_err() {
            return;
        }
        let _ = release_rx.recv();
    });

    (url, release_tx)
}

/// 16-bit stereo WAV header claiming far more data than will ever arrive.
fn endless_wav_header(sample_rate: u32) -> Vec<u8> {
    let data_len: u32 = 0x7fff_0000;
    let mut h = Vec::with_capacity(44);
    h.extend_from_slice(b"RIFF");
    h.extend_from_slice(&(data_len + 36).to_le_bytes());
    h.extend_from_slice(b"WAVE");
    h.extend_from_slice(b"fmt ");
    h.extend_from_slice(&16u32.to_le_bytes());
    h.extend_from_slice(&1u16.to_le_bytes());
    h.extend_from_slice(&2u16.to_le_bytes());
    h.extend_from_slice(&sample_rate.to_le_bytes());
    h.extend_from_slice(&(sample_rate * 4).to_le_bytes());
    h.extend_from_slice(&4u16.to_le_bytes());
    h.extend_from_slice(&16u16.to_le_bytes());
    h.extend_from_slice(b"data");
    h.extend_from_slice(&data_len.to_le_bytes());
    h
}

#[test]
fn stalled_stream_fails_instead_of_blocking_forever() {
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Type: audio/wav\r\nConnection: close\r\n\r\n".to_vec();
    response.extend(endless_wav_header(8_000));
    for i in 0..2048i16 {
        let s = (i % 64) * 100;
        response.extend_from_slice(&s.to_le_bytes());
        response.extend_from_slice(&(-s).to_le_bytes());
    }
    let (url, _hold) = serve_then_hold(response);

    let network = NetworkConfig {
        read_timeout_secs: 1,
        ..NetworkConfig::default()
    };
    let client = http_client(&network).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let result = open_http_stream(&client, &url).map(|mut stream| {
            let mut buf = vec![[0.0f32; 2]; 4096];
            let mut frames = 0usize;
            loop {
                match stream.read_frames(&mut buf) {
                    Ok(0) => break Ok(frames),
                    Ok(n) => frames += n,
                    Err(e) => break Err(e),
                }
            }
        });
        let _ = done_tx.send(result.map_err(|e| e.to_string()));
    });

    let outcome = done_rx
        .recv_timeout(Duration::from_secs(20))
        .expect("read_frames still blocked on a stalled server");
    let read = outcome.expect("stream should open from the header alone");
    assert!(
        matches!(read, Err(PipelineError::SourceFailure(_))),
        "expected a source failure, got {read:?}"
    );
}

#[test]
fn playlist_is_fetched_and_parsed() {
    let body = "<songs><song><title>Only Track</title><artist>Someone</artist>\
                <album>Somewhere</album></song></songs>";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let (url, _hold) = serve_then_hold(response.into_bytes());
    let client = http_client(&NetworkConfig::default()).unwrap();

    let playlist = fetch_playlist(&client, &url, Duration::from_secs(5)).unwrap();
    assert_eq!(playlist.current().map(|s| s.title.as_str()), Some("Only Track"));
}

#[test]
fn playlist_deadline_bounds_a_stalled_request() {
    let response =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 4096\r\n\r\n<songs>".to_vec();
    let (url, _hold) = serve_then_hold(response);
    let network = NetworkConfig {
        read_timeout_secs: 60,
        ..NetworkConfig::default()
    };
    let client = http_client(&network).unwrap();

    let started = Instant::now();
    let result = fetch_playlist(&client, &url, Duration::from_secs(1));
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(15));
}
