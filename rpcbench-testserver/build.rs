use std::path::Path;
use std::process::Command;

const PROTO: &str = "proto/bench.proto";

fn main() {
    println!("cargo:rerun-if-changed={PROTO}");
    println!("cargo:rerun-if-env-changed=PROTOC");

    if let Err(msg) = check_protoc() {
        panic!("{msg}\nthe benchmark test server needs protoc; install it or point PROTOC at it");
    }

    let proto = Path::new(PROTO);
    let include = proto.parent().unwrap_or_else(|| Path::new("."));

    if let Err(e) = tonic_prost_build::configure()
        .build_client(false)
        .compile_protos(&[proto], &[include])
    {
        panic!("could not generate the BenchmarkService server from {PROTO}: {e}");
    }
}

/// `PROTOC` wins when set; otherwise `protoc` must run from PATH.
fn check_protoc() -> Result<(), String> {
    if std::env::var_os("PROTOC").is_some_and(|v| !v.is_empty()) {
        return Ok(());
    }

    match Command::new("protoc").arg("--version").output() {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => Err(format!(
            "`protoc --version` exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )),
        Err(e) => Err(format!("`protoc` is not on PATH: {e}")),
    }
}
