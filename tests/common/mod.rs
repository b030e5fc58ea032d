#![allow(dead_code)]

use gotchipush::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};

const LINKTYPE_ETHERNET: u32 = 1;

/// Little-endian classic pcap with Ethernet link type.
pub fn pcap(records: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0xA1B2_C3D4u32.to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&4u16.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&65535u32.to_le_bytes());
    buf.extend_from_slice(&LINKTYPE_ETHERNET.to_le_bytes());
    for (i, data) in records.iter().enumerate() {
        buf.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        buf.extend_from_slice(data);
    }
    buf
}

pub fn ethernet_frame(ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xFF; 6];
    frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Capture holding one IPv4 frame and one EAPOL-Key frame. `tag` varies the bytes.
pub fn handshake_capture(tag: u8) -> Vec<u8> {
    let mut eapol = vec![0x02, 0x03, 0x00, 0x5F];
    eapol.extend(std::iter::repeat(tag).take(0x5F));
    pcap(&[
        ethernet_frame(0x0800, &[0x45; 40]),
        ethernet_frame(0x888E, &eapol),
    ])
}

/// Well-formed capture without any handshake frame.
pub fn plain_capture() -> Vec<u8> {
    pcap(&[
        ethernet_frame(0x0800, &[0x45; 40]),
        ethernet_frame(0x0806, &[0x00; 28]),
    ])
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

pub fn test_config(handshake_dir: &Path, ledger_path: &Path, api_url: &str) -> AppConfig {
    AppConfig {
        handshake_dir: handshake_dir.to_path_buf(),
        api_url: api_url.to_string(),
        api_key: "test-key".to_string(),
        ledger_path: ledger_path.to_path_buf(),
        timeout_secs: 5,
        capture_pattern: "*.pcap".to_string(),
    }
}

pub fn read_ledger(path: &Path) -> Vec<String> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Nothing listens on port 1; any request fails at connect time.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";
