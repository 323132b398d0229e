//! Integration tests for [`SeekableSource`] against a real
//! `media_range_core::MediaResource`, in the same in-process mock-server
//! style as `media-range-core`'s own `tests/range_fetching.rs`.

use std::convert::Infallible;
use std::io::{Read, Seek, SeekFrom};
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::sync::oneshot;

use media_range_adapters::SeekableSource;
use media_range_core::{MediaResource, MediaResourceConfig};

struct MockServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn start_mock_server(image: Vec<u8>) -> MockServer {
    let image = Arc::new(image);
    let (addr_tx, addr_rx) = std::sync::mpsc::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread_image = Arc::clone(&image);
    let join = std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("mock server runtime");
        rt.block_on(async move {
            let make_svc = {
                let image = Arc::clone(&thread_image);
                make_service_fn(move |_conn| {
                    let image = Arc::clone(&image);
                    async move {
                        Ok::<_, Infallible>(service_fn(move |req| handle(req, Arc::clone(&image))))
                    }
                })
            };
            let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
            let builder = Server::try_bind(&addr).expect("bind mock server");
            let local_addr = builder.local_addr();
            addr_tx.send(local_addr).unwrap();
            let server = builder.serve(make_svc).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });

    let local_addr = addr_rx.recv().expect("mock server address");
    MockServer {
        url: format!("http://{local_addr}/stream.bin"),
        shutdown: Some(shutdown_tx),
        join: Some(join),
    }
}

async fn handle(req: Request<Body>, image: Arc<Vec<u8>>) -> Result<Response<Body>, Infallible> {
    match *req.method() {
        Method::HEAD => {
            let mut resp = Response::new(Body::empty());
            *resp.status_mut() = StatusCode::OK;
            resp.headers_mut().insert(
                CONTENT_LENGTH,
                (image.len() as u64).to_string().parse().unwrap(),
            );
            resp.headers_mut()
                .insert(CONTENT_TYPE, "application/octet-stream".parse().unwrap());
            Ok(resp)
        }
        Method::GET => {
            let Some(range) = req.headers().get(RANGE).and_then(|v| v.to_str().ok()) else {
                let mut resp = Response::new(Body::from(image.as_slice().to_vec()));
                *resp.status_mut() = StatusCode::OK;
                return Ok(resp);
            };
            let (start, end_inclusive) = match parse_range(range, image.len() as u64) {
                Some(v) => v,
                None => {
                    let mut resp = Response::new(Body::empty());
                    *resp.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
                    return Ok(resp);
                }
            };
            let end_exclusive = (end_inclusive + 1) as usize;
            let body = image[start as usize..end_exclusive].to_vec();
            let mut resp = Response::new(Body::from(body));
            *resp.status_mut() = StatusCode::PARTIAL_CONTENT;
            resp.headers_mut().insert(
                CONTENT_RANGE,
                format!("bytes {start}-{end_inclusive}/{}", image.len())
                    .parse()
                    .unwrap(),
            );
            resp.headers_mut()
                .insert(CONTENT_TYPE, "application/octet-stream".parse().unwrap());
            Ok(resp)
        }
        _ => {
            let mut resp = Response::new(Body::empty());
            *resp.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            Ok(resp)
        }
    }
}

fn parse_range(header: &str, total: u64) -> Option<(u64, u64)> {
    let spec = header.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end_inclusive: u64 = end.parse().ok()?;
    let end_inclusive = end_inclusive.min(total.saturating_sub(1));
    if start > end_inclusive {
        return None;
    }
    Some((start, end_inclusive))
}

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn test_config(packet_size: usize) -> MediaResourceConfig {
    let mut config = MediaResourceConfig::default();
    config.packet_size = packet_size;
    config.near_window = 2;
    config
}

#[test]
fn sequential_read_through_std_io_read_matches_source() {
    let img = image(1024);
    let server = start_mock_server(img.clone());
    let resource =
        Arc::new(MediaResource::open(&server.url, test_config(64)).expect("open should succeed"));
    let mut source = SeekableSource::new(resource);

    let mut buf = vec![0u8; 1024];
    source.read_exact(&mut buf).unwrap();
    assert_eq!(buf, img);
}

#[test]
fn seek_start_then_read_matches_source_offset() {
    let img = image(512);
    let server = start_mock_server(img.clone());
    let resource = Arc::new(MediaResource::open(&server.url, test_config(64)).unwrap());
    let mut source = SeekableSource::new(resource);

    source.seek(SeekFrom::Start(100)).unwrap();
    let mut buf = vec![0u8; 32];
    source.read_exact(&mut buf).unwrap();
    assert_eq!(buf, img[100..132]);
    assert_eq!(source.position(), 132);
}

#[test]
fn seek_from_end_reads_tail() {
    let img = image(256);
    let server = start_mock_server(img.clone());
    let resource = Arc::new(MediaResource::open(&server.url, test_config(64)).unwrap());
    let mut source = SeekableSource::new(resource);

    source.seek(SeekFrom::End(-16)).unwrap();
    let mut buf = vec![0u8; 16];
    source.read_exact(&mut buf).unwrap();
    assert_eq!(buf, img[240..256]);
}

#[test]
fn read_past_content_length_returns_zero() {
    let img = image(64);
    let server = start_mock_server(img);
    let resource = Arc::new(MediaResource::open(&server.url, test_config(64)).unwrap());
    let mut source = SeekableSource::new(resource);

    source.seek(SeekFrom::Start(64)).unwrap();
    let mut buf = vec![0u8; 8];
    assert_eq!(source.read(&mut buf).unwrap(), 0);
}
