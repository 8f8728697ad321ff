//! A small engine written in WAT that honours the real engine's ABI.
//!
//! - `encode` returns 0 for empty text, for text starting with `!` (after
//!   raising one `on_found` event), and for more than 17 bytes at version
//!   id 3. Otherwise it renders a `len` x `scale` image whose pixel `x` on
//!   every row is grey level `text[x]`.
//! - `detect` blanks the pixels in place, writes `HI` to the output buffer
//!   and raises one event per image row: QR (version 1, level M, mask 2) on
//!   even rows and EAN13 on odd rows, with the image outline as corners.
//!   A gamma above 100 reports an out-of-range corner pointer.

#![allow(dead_code)]

use qrean::{QreanRuntime, RuntimeConfig, Session, SessionConfig};

pub const HEAP_BASE: u32 = 4096;

const MOCK_ENGINE: &str = r#"
(module
  (import "env" "on_found" (func $on_found (param i32 i32 i32 i32 i32 i32)))
  (import "env" "debug" (func $debug (param i32)))
  (memory (export "memory") 2)
  (global (export "__heap_base") i32 (i32.const 4096))
  (global $next (mut i32) (i32.const 0))
  (global $limit (mut i32) (i32.const 0))
  (global $debug_on (mut i32) (i32.const 0))
  (data (i32.const 1024) "encode called\00")
  (data (i32.const 1040) "HI\00")

  (func (export "tinymm_init") (param $base i32) (param $size i32) (param $blocks i32)
    (global.set $next (local.get $base))
    (global.set $limit (i32.add (local.get $base) (local.get $size))))

  (func $malloc (export "malloc") (param $size i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (i32.and (i32.add (global.get $next) (i32.const 7)) (i32.const -8)))
    (if (i32.gt_u (local.get $ptr) (global.get $limit))
      (then (return (i32.const 0))))
    (if (i32.gt_u (local.get $size) (i32.sub (global.get $limit) (local.get $ptr)))
      (then (return (i32.const 0))))
    (global.set $next (i32.add (local.get $ptr) (local.get $size)))
    (local.get $ptr))

  (func (export "free") (param i32))

  (func (export "enable_debug")
    (global.set $debug_on (i32.const 1)))

  (func $strlen (param $p i32) (result i32)
    (local $n i32)
    (block $done
      (loop $scan
        (br_if $done (i32.eqz (i32.load8_u (i32.add (local.get $p) (local.get $n)))))
        (local.set $n (i32.add (local.get $n) (i32.const 1)))
        (br $scan)))
    (local.get $n))

  (func (export "encode") (param $text i32) (param $opts i32) (result i32)
    (local $len i32) (local $h i32) (local $n i32) (local $rec i32)
    (local $px i32) (local $i i32) (local $c i32)
    (if (global.get $debug_on)
      (then (call $debug (i32.const 1024))))
    (if (i32.eq (i32.load8_u (local.get $text)) (i32.const 33))
      (then
        (call $on_found (i32.const 1) (i32.const 1040) (i32.const 3)
                        (i32.const 1) (i32.const 2) (i32.const 0))
        (return (i32.const 0))))
    (local.set $len (call $strlen (local.get $text)))
    (if (i32.eqz (local.get $len))
      (then (return (i32.const 0))))
    (if (i32.and (i32.eq (i32.load offset=12 (local.get $opts)) (i32.const 3))
                 (i32.gt_u (local.get $len) (i32.const 17)))
      (then (return (i32.const 0))))
    (local.set $h (i32.load offset=36 (local.get $opts)))
    (local.set $n (i32.mul (local.get $len) (local.get $h)))
    (local.set $rec (call $malloc (i32.add (i32.const 12) (i32.shl (local.get $n) (i32.const 2)))))
    (if (i32.eqz (local.get $rec))
      (then (return (i32.const 0))))
    (local.set $px (i32.add (local.get $rec) (i32.const 12)))
    (i32.store (local.get $rec) (local.get $len))
    (i32.store offset=4 (local.get $rec) (local.get $h))
    (i32.store offset=8 (local.get $rec) (local.get $px))
    (block $done
      (loop $fill
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (local.set $c (i32.load8_u
          (i32.add (local.get $text) (i32.rem_u (local.get $i) (local.get $len)))))
        (i32.store
          (i32.add (local.get $px) (i32.shl (local.get $i) (i32.const 2)))
          (i32.or (i32.mul (local.get $c) (i32.const 0x010101)) (i32.const 0xFF000000)))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $fill)))
    (local.get $rec))

  (func (export "detect") (param $out i32) (param $out_size i32) (param $img i32)
                          (param $gamma f64) (param $eci i32) (result i32)
    (local $w i32) (local $h i32) (local $pts i32) (local $i i32)
    (local.set $w (i32.load (local.get $img)))
    (local.set $h (i32.load offset=4 (local.get $img)))
    (memory.fill
      (i32.load offset=8 (local.get $img))
      (i32.const 0)
      (i32.shl (i32.mul (local.get $w) (local.get $h)) (i32.const 2)))
    (if (i32.ge_u (local.get $out_size) (i32.const 3))
      (then
        (i32.store8 (local.get $out) (i32.const 72))
        (i32.store8 offset=1 (local.get $out) (i32.const 73))
        (i32.store8 offset=2 (local.get $out) (i32.const 0))))
    (local.set $pts (call $malloc (i32.const 32)))
    (f32.store (local.get $pts) (f32.const 0))
    (f32.store offset=4 (local.get $pts) (f32.const 0))
    (f32.store offset=8 (local.get $pts) (f32.convert_i32_u (local.get $w)))
    (f32.store offset=12 (local.get $pts) (f32.const 0))
    (f32.store offset=16 (local.get $pts) (f32.convert_i32_u (local.get $w)))
    (f32.store offset=20 (local.get $pts) (f32.convert_i32_u (local.get $h)))
    (f32.store offset=24 (local.get $pts) (f32.const 0))
    (f32.store offset=28 (local.get $pts) (f32.convert_i32_u (local.get $h)))
    (if (f64.gt (local.get $gamma) (f64.const 100))
      (then (local.set $pts (i32.const -16))))
    (block $done
      (loop $emit
        (br_if $done (i32.ge_u (local.get $i) (local.get $h)))
        (if (i32.and (local.get $i) (i32.const 1))
          (then
            (call $on_found (i32.const 5) (local.get $out) (i32.const 0)
                            (i32.const 0) (i32.const 0) (local.get $pts)))
          (else
            (call $on_found (i32.const 1) (local.get $out) (i32.const 3)
                            (i32.const 1) (i32.const 2) (local.get $pts))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $emit)))
    (local.get $h))
)
"#;

pub fn mock_engine() -> Vec<u8> {
    wat::parse_str(MOCK_ENGINE).expect("Failed to parse WAT")
}

/// Same engine, but an older build whose `detect` takes gamma as `f32`.
pub fn mock_engine_f32_gamma() -> Vec<u8> {
    let source = MOCK_ENGINE
        .replace("(param $gamma f64)", "(param $gamma f32)")
        .replace(
            "(f64.gt (local.get $gamma) (f64.const 100))",
            "(f32.gt (local.get $gamma) (f32.const 100))",
        );
    wat::parse_str(source).expect("Failed to parse WAT")
}

/// Same engine with a `detect` export of the wrong shape.
pub fn mock_engine_bad_detect() -> Vec<u8> {
    let source = MOCK_ENGINE.replace("(param $eci i32)", "(param $eci i64)");
    wat::parse_str(source).expect("Failed to parse WAT")
}

pub fn runtime() -> QreanRuntime {
    QreanRuntime::new(&mock_engine()).expect("Failed to compile mock engine")
}

pub fn runtime_with(config: RuntimeConfig) -> QreanRuntime {
    QreanRuntime::with_config(&mock_engine(), config).expect("Failed to compile mock engine")
}

pub fn session() -> Session {
    runtime()
        .session(SessionConfig::default())
        .expect("Failed to create session")
}

/// Opaque white `width` x `height` image.
pub fn white(width: u32, height: u32) -> qrean::Image {
    qrean::Image::new(width, height, vec![255; (width * height * 4) as usize])
        .expect("valid image")
}
