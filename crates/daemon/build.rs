// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::var("OUT_DIR")?;
    let path = std::path::Path::new(&out_dir).join("env_names.rs");
    let mut f = std::fs::File::create(path)?;

    let vars = [
        (
            "RCCD_INACTIVITY_SECS",
            "RCCD_INACTIVITY_SECS",
            "seconds without a request before the server exits",
        ),
        (
            "RCCD_MEMORY_SEND_DELAY_MS",
            "RCCD_MEMORY_SEND_DELAY_MS",
            "simulated send latency of the loopback client",
        ),
        (
            "RUST_LOG",
            "RUST_LOG",
            "log level filtering (used by tracing-subscriber)",
        ),
    ];

    for (const_name, env_name, doc) in &vars {
        writeln!(f, "/// Environment variable: {doc}.")?;
        writeln!(f, "pub const {const_name}: &str = \"{env_name}\";")?;
    }

    Ok(())
}
