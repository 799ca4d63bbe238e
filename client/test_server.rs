use heart_deps::{
	tokio::{
		self,
		io::{AsyncReadExt, AsyncWriteExt},
		net::TcpListener,
	},
	url::Url,
};
use hyper::{
	header,
	service::{make_service_fn, service_fn},
	Body, Request, Response, Server, StatusCode,
};
use std::{
	convert::Infallible,
	net::SocketAddr,
	sync::{Arc, Mutex},
	time::Duration,
};

/// A request received by the test server.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub authorization: Option<String>,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}

pub struct Reply {
	pub status: u16,
	pub body: String,
	pub delay: Duration,
}

impl Reply {
	pub fn new(status: u16, body: &str) -> Reply {
		Reply {
			status,
			body: body.to_owned(),
			delay: Duration::from_millis(0),
		}
	}

	pub fn delayed(mut self, delay: Duration) -> Reply {
		self.delay = delay;
		self
	}
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

/// An HTTP server on an ephemeral port that records every request and answers with whatever the handler returns. Must be started inside a tokio runtime.
pub struct TestServer {
	addr: SocketAddr,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
	pub fn start(handler: impl Fn(&RecordedRequest) -> Reply + Send + Sync + 'static) -> TestServer {
		let handler: Handler = Arc::new(handler);
		let requests = Arc::new(Mutex::new(Vec::new()));
		let service_requests = requests.clone();
		let make_service = make_service_fn(move |_| {
			let handler = handler.clone();
			let requests = service_requests.clone();
			async move {
				Ok::<_, Infallible>(service_fn(move |request: Request<Body>| {
					let handler = handler.clone();
					let requests = requests.clone();
					handle(handler, requests, request)
				}))
			}
		});
		let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_service);
		let addr = server.local_addr();
		tokio::spawn(async move {
			if let Err(error) = server.await {
				eprintln!("test server error: {}", error);
			}
		});
		TestServer { addr, requests }
	}

	/// Answer every request with `status` and `body`.
	pub fn replying(status: u16, body: &'static str) -> TestServer {
		TestServer::start(move |_| Reply::new(status, body))
	}

	pub fn url(&self) -> Url {
		format!("http://{}", self.addr).parse().unwrap()
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().unwrap().clone()
	}
}

async fn handle(
	handler: Handler,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
	request: Request<Body>,
) -> Result<Response<Body>, hyper::Error> {
	let (parts, body) = request.into_parts();
	let body = hyper::body::to_bytes(body).await?;
	let header_value = |name: header::HeaderName| {
		parts
			.headers
			.get(name)
			.and_then(|value| value.to_str().ok())
			.map(|value| value.to_owned())
	};
	let recorded = RecordedRequest {
		method: parts.method.to_string(),
		path: parts.uri.path().to_owned(),
		authorization: header_value(header::AUTHORIZATION),
		content_type: header_value(header::CONTENT_TYPE),
		body: body.to_vec(),
	};
	let reply = handler(&recorded);
	requests.lock().unwrap().push(recorded);
	if reply.delay > Duration::from_millis(0) {
		tokio::time::delay_for(reply.delay).await;
	}
	let response = Response::builder()
		.status(StatusCode::from_u16(reply.status).unwrap())
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(reply.body))
		.unwrap();
	Ok(response)
}

/// A url nothing is listening on.
pub fn unreachable_url() -> Url {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);
	format!("http://{}", addr).parse().unwrap()
}

/// A server that answers one request with a 200 status and then closes the connection partway through the body.
pub async fn truncated_body_url() -> Url {
	let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		let (mut socket, _) = listener.accept().await.unwrap();
		let mut received = Vec::new();
		let mut buffer = [0u8; 1024];
		while !request_complete(&received) {
			let n = socket.read(&mut buffer).await.unwrap();
			if n == 0 {
				break;
			}
			received.extend_from_slice(&buffer[..n]);
		}
		let response = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"prediction\": 1";
		socket.write_all(response.as_bytes()).await.unwrap();
		socket.flush().await.unwrap();
	});
	format!("http://{}", addr).parse().unwrap()
}

fn request_complete(received: &[u8]) -> bool {
	let text = String::from_utf8_lossy(received);
	let header_end = match text.find("\r\n\r\n") {
		Some(index) => index + 4,
		None => return false,
	};
	let content_length = text[..header_end]
		.lines()
		.filter_map(|line| {
			let mut parts = line.splitn(2, ':');
			let name = parts.next()?;
			let value = parts.next()?;
			if name.eq_ignore_ascii_case("content-length") {
				value.trim().parse::<usize>().ok()
			} else {
				None
			}
		})
		.next()
		.unwrap_or(0);
	received.len() >= header_end + content_length
}
