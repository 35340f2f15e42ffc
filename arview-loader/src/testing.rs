//! Test fixtures: in-memory GLB files and a local HTTP server
//!
//! Enabled for this crate's tests and, through the `testing` feature, for
//! dependents' tests.

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const ANIMATED_JSON: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "name": "Scene", "nodes": [0] } ],
  "nodes": [
    { "name": "Root", "children": [1] },
    { "name": "Cube", "mesh": 0, "translation": [0.0, 0.5, 0.0] }
  ],
  "meshes": [ { "name": "Cube", "primitives": [ { "attributes": { "POSITION": 2 } } ] } ],
  "buffers": [ { "byteLength": 32 } ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 8 },
    { "buffer": 0, "byteOffset": 8, "byteLength": 24 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
    { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" },
    { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [0.0, 1.0, 0.0] }
  ],
  "animations": [
    {
      "name": "Bounce",
      "samplers": [ { "input": 0, "output": 1 }, { "input": 0, "output": 1 } ],
      "channels": [
        { "sampler": 0, "target": { "node": 1, "path": "translation" } },
        { "sampler": 1, "target": { "node": 1, "path": "scale" } }
      ]
    },
    {
      "name": "Idle",
      "samplers": [ { "input": 0, "output": 1 } ],
      "channels": [ { "sampler": 0, "target": { "node": 0, "path": "translation" } } ]
    }
  ]
}"#;

/// Build a binary glTF container from a JSON document and an optional BIN chunk.
pub fn glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json_chunk = json.as_bytes().to_vec();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let bin_chunk = bin.map(|bytes| {
        let mut chunk = bytes.to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(0);
        }
        chunk
    });

    let mut total = 12 + 8 + json_chunk.len();
    if let Some(chunk) = &bin_chunk {
        total += 8 + chunk.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);

    if let Some(chunk) = bin_chunk {
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&chunk);
    }
    out
}

/// Scene "Scene" with nodes Root -> Cube and two animations, "Bounce"
/// (translation and scale on Cube) then "Idle" (translation on Root).
pub fn animated_glb() -> Vec<u8> {
    let mut bin = Vec::with_capacity(32);
    for t in [0.0f32, 1.0] {
        bin.extend_from_slice(&t.to_le_bytes());
    }
    for v in [0.0f32, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    glb(ANIMATED_JSON, Some(&bin))
}

/// A valid document with no scenes.
pub fn sceneless_glb() -> Vec<u8> {
    glb(r#"{"asset":{"version":"2.0"}}"#, None)
}

/// A single-node scene with no buffers or animations.
pub fn static_glb() -> Vec<u8> {
    glb(
        r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"name":"Static","nodes":[0]}],"nodes":[{"name":"Single"}]}"#,
        None,
    )
}

/// Nodes 0 and 1 list each other as children.
pub fn cyclic_glb() -> Vec<u8> {
    glb(
        r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"children":[1]},{"children":[0]}]}"#,
        None,
    )
}

/// Fresh, empty directory unique to this process.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("arview-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

/// A port nothing is listening on.
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("No local addr").port();
    drop(listener);
    port
}

/// A fixed response for one path.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Route {
    pub fn new(path: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            status,
            body,
        }
    }

    pub fn ok(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(path, 200, body)
    }
}

/// HTTP server on a background thread. Unknown paths get a 404.
///
/// Stops when dropped.
pub struct TestServer {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    requests: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start(routes: Vec<Route>) -> Self {
        let server = Arc::new(tiny_http::Server::http("127.0.0.1:0").expect("Failed to start server"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("Server is not listening on IP");
        let requests = Arc::new(AtomicUsize::new(0));

        let handle = {
            let server = server.clone();
            let requests = requests.clone();
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    requests.fetch_add(1, Ordering::SeqCst);
                    let response = match routes.iter().find(|r| r.path == request.url()) {
                        Some(route) => tiny_http::Response::from_data(route.body.clone())
                            .with_status_code(route.status),
                        None => tiny_http::Response::from_data(b"not found".to_vec())
                            .with_status_code(404),
                    };
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            addr,
            server,
            requests,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
