//! WAT fixtures standing in for the native core in tests.

use wasmtime::{Instance, Store};

/// A core exporting every symbol, with counters exported as globals.
///
/// - `malloc` is a bump allocator starting at 4096; `free` counts calls.
/// - the sensor setters record their argument.
/// - save state is the 8 bytes at offset 256 (initially `mGBAstat`).
pub const FULL_CORE_WAT: &str = r#"(module
  (memory (export "memory") 2)
  (global $heap (mut i32) (i32.const 4096))
  (global $frees (export "frees") (mut i32) (i32.const 0))
  (global $last_free (export "last_free") (mut i32) (i32.const 0))
  (global $accel_ptr (export "accel_ptr") (mut i32) (i32.const 0))
  (global $gyro_ptr (export "gyro_ptr") (mut i32) (i32.const 0))
  (global $light (export "light") (mut i32) (i32.const -1))
  (global $inits (export "inits") (mut i32) (i32.const 0))
  (global $deinits (export "deinits") (mut i32) (i32.const 0))
  (global $runs (export "runs") (mut i32) (i32.const 0))
  (global $resets (export "resets") (mut i32) (i32.const 0))
  (global $loads (export "loads") (mut i32) (i32.const 0))
  (global $load_arg (export "load_arg") (mut i32) (i32.const -1))
  (global $unloads (export "unloads") (mut i32) (i32.const 0))

  (func (export "malloc") (param $size i32) (result i32)
    (local $p i32)
    (local.set $p (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $size)))
    (local.get $p))
  (func (export "free") (param $p i32)
    (global.set $frees (i32.add (global.get $frees) (i32.const 1)))
    (global.set $last_free (local.get $p)))
  (func (export "memcpy") (param $d i32) (param $s i32) (param $n i32) (result i32)
    (memory.copy (local.get $d) (local.get $s) (local.get $n))
    (local.get $d))
  (func (export "memset") (param $d i32) (param $v i32) (param $n i32) (result i32)
    (memory.fill (local.get $d) (local.get $v) (local.get $n))
    (local.get $d))

  (func (export "mgba_set_accelerometer") (param $p i32)
    (global.set $accel_ptr (local.get $p)))
  (func (export "mgba_set_gyroscope") (param $p i32)
    (global.set $gyro_ptr (local.get $p)))
  (func (export "mgba_set_light_sensor") (param $l i32)
    (global.set $light (local.get $l)))
  (func (export "mgba_get_save_type") (result i32) (i32.const 2))

  (func (export "retro_init")
    (global.set $inits (i32.add (global.get $inits) (i32.const 1))))
  (func (export "retro_deinit")
    (global.set $deinits (i32.add (global.get $deinits) (i32.const 1))))
  (func (export "retro_api_version") (result i32) (i32.const 1))
  (func (export "retro_get_system_info") (param i32))
  (func (export "retro_get_system_av_info") (param i32))
  (func (export "retro_set_environment") (param i32))
  (func (export "retro_set_video_refresh") (param i32))
  (func (export "retro_set_audio_sample_batch") (param i32))
  (func (export "retro_set_input_poll") (param i32))
  (func (export "retro_set_input_state") (param i32))
  (func (export "retro_reset")
    (global.set $resets (i32.add (global.get $resets) (i32.const 1))))
  (func (export "retro_run")
    (global.set $runs (i32.add (global.get $runs) (i32.const 1))))

  (func (export "retro_serialize_size") (result i32) (i32.const 8))
  (func (export "retro_serialize") (param $p i32) (param $n i32) (result i32)
    (if (i32.lt_u (local.get $n) (i32.const 8))
      (then (return (i32.const 0))))
    (memory.copy (local.get $p) (i32.const 256) (i32.const 8))
    (i32.const 1))
  (func (export "retro_unserialize") (param $p i32) (param $n i32) (result i32)
    (if (i32.ne (local.get $n) (i32.const 8))
      (then (return (i32.const 0))))
    (memory.copy (i32.const 256) (local.get $p) (i32.const 8))
    (i32.const 1))

  (func (export "retro_load_game") (param $p i32) (result i32)
    (global.set $loads (i32.add (global.get $loads) (i32.const 1)))
    (global.set $load_arg (local.get $p))
    (i32.const 1))
  (func (export "retro_unload_game")
    (global.set $unloads (i32.add (global.get $unloads) (i32.const 1))))

  (data (i32.const 256) "mGBAstat"))
"#;

/// Sensor setters exist but no allocator: vector payloads cannot be marshaled.
pub const NO_ALLOCATOR_CORE_WAT: &str = r#"(module
  (memory (export "memory") 1)
  (global $accel_calls (export "accel_calls") (mut i32) (i32.const 0))
  (global $light (export "light") (mut i32) (i32.const -1))
  (func (export "mgba_set_accelerometer") (param i32)
    (global.set $accel_calls (i32.add (global.get $accel_calls) (i32.const 1))))
  (func (export "mgba_set_light_sensor") (param $l i32)
    (global.set $light (local.get $l))))
"#;

/// The accelerometer setter traps after the payload was allocated.
pub const TRAPPING_CORE_WAT: &str = r#"(module
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (global $frees (export "frees") (mut i32) (i32.const 0))
  (func (export "malloc") (param $size i32) (result i32)
    (local $p i32)
    (local.set $p (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $size)))
    (local.get $p))
  (func (export "free") (param i32)
    (global.set $frees (i32.add (global.get $frees) (i32.const 1))))
  (func (export "mgba_set_accelerometer") (param i32)
    unreachable))
"#;

/// An Emscripten-style core whose `malloc` grows the heap through a host import.
pub const RESIZING_CORE_WAT: &str = r#"(module
  (import "env" "emscripten_resize_heap" (func $resize_heap (param i32) (result i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (global $accel_ptr (export "accel_ptr") (mut i32) (i32.const 0))
  (func (export "malloc") (param $size i32) (result i32)
    (local $p i32)
    (drop (call $resize_heap (local.get $size)))
    (local.set $p (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $size)))
    (local.get $p))
  (func (export "free") (param i32))
  (func (export "mgba_set_accelerometer") (param $p i32)
    (global.set $accel_ptr (local.get $p))))
"#;

/// Read an exported `i32` global.
pub fn global_i32<T: 'static>(instance: &Instance, store: &mut Store<T>, name: &str) -> i32 {
    instance
        .get_global(&mut *store, name)
        .and_then(|g| g.get(&mut *store).i32())
        .unwrap_or_else(|| panic!("missing i32 global {name}"))
}

/// Read three little-endian `f32` at `ptr`.
pub fn read_vec3<T: 'static>(instance: &Instance, store: &mut Store<T>, ptr: u32) -> [f32; 3] {
    let memory = instance.get_memory(&mut *store, "memory").unwrap();
    let mut bytes = [0u8; 12];
    memory.read(&*store, ptr as usize, &mut bytes).unwrap();
    let f = |i: usize| f32::from_le_bytes(bytes[i..i + 4].try_into().unwrap());
    [f(0), f(4), f(8)]
}

pub mod http {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single HTTP response on an ephemeral port; returns a URL to it.
    pub async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/rom.gba")
    }
}
