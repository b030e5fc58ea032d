/*!
 * Capture file validation
 *
 * A file is accepted when it is a non-empty classic pcap container (either byte order)
 * holding at least one EAPOL frame, the link-layer frame type that carries the
 * WPA/WPA2 4-way handshake.
 */

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Little-endian classic pcap header, as written on x86 capture hosts.
pub const PCAP_MAGIC_LE: [u8; 4] = [0xD4, 0xC3, 0xB2, 0xA1];
/// Big-endian classic pcap header.
pub const PCAP_MAGIC_BE: [u8; 4] = [0xA1, 0xB2, 0xC3, 0xD4];

const READER_CAPACITY: usize = 1 << 20; // 1MB, comfortably above any snaplen

const ETHERTYPE_EAPOL: u16 = 0x888E;
const ETHERTYPE_VLAN: [u16; 3] = [0x8100, 0x88A8, 0x9100];
// Version, packet type, body length
const EAPOL_HEADER_LEN: usize = 4;
const LLC_SNAP_EAPOL: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];

const LINKTYPE_ETHERNET: i32 = 1;
const LINKTYPE_IEEE802_11: i32 = 105;
const LINKTYPE_LINUX_SLL: i32 = 113;
const LINKTYPE_IEEE802_11_PRISM: i32 = 119;
const LINKTYPE_IEEE802_11_RADIOTAP: i32 = 127;
const LINKTYPE_IEEE802_11_AVS: i32 = 163;
const LINKTYPE_PPI: i32 = 192;
const LINKTYPE_LINUX_SLL2: i32 = 276;

/// Why a capture file was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidCapture {
    #[error("file is empty")]
    Empty,

    #[error("file is too short to hold a pcap header")]
    TooShort,

    #[error("invalid pcap magic bytes {0:02X?}")]
    BadMagic([u8; 4]),

    #[error("no handshake data (EAPOL packets) found in {records} records")]
    NoHandshake { records: usize },

    #[error("malformed capture: {0}")]
    Malformed(String),

    #[error("unreadable: {0}")]
    Unreadable(String),
}

impl From<io::Error> for InvalidCapture {
    fn from(e: io::Error) -> Self {
        InvalidCapture::Unreadable(e.to_string())
    }
}

/// Logs the rejection reason and collapses the verdict to a bool.
pub fn is_valid_handshake(path: &Path) -> bool {
    match validate(path) {
        Ok(()) => true,
        Err(reason) => {
            warn!("Invalid handshake file {}: {}", path.display(), reason);
            false
        }
    }
}

/// Empty check, then the magic-number gate, then a record scan that stops at the
/// first EAPOL frame.
pub fn validate(path: &Path) -> Result<(), InvalidCapture> {
    if fs::metadata(path)?.len() == 0 {
        return Err(InvalidCapture::Empty);
    }
    check_magic(path)?;
    scan_for_handshake(path)
}

/// Cheap structural pre-check on the first four bytes. Contents past the magic are not read.
pub fn check_magic(path: &Path) -> Result<(), InvalidCapture> {
    let mut f = File::open(path)?;
    let mut magic = [0u8; 4];
    match f.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(InvalidCapture::TooShort)
        }
        Err(e) => return Err(e.into()),
    }

    if magic == PCAP_MAGIC_LE || magic == PCAP_MAGIC_BE {
        Ok(())
    } else {
        Err(InvalidCapture::BadMagic(magic))
    }
}

fn scan_for_handshake(path: &Path) -> Result<(), InvalidCapture> {
    let file = File::open(path)?;
    let mut reader = LegacyPcapReader::new(READER_CAPACITY, file)
        .map_err(|e| InvalidCapture::Malformed(format!("{:?}", e)))?;

    let mut linktype = LINKTYPE_ETHERNET;
    let mut records = 0usize;
    // Set after a refill; a second Incomplete in a row means the file ends mid-record
    let mut stalled = false;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let found = match block {
                    PcapBlockOwned::LegacyHeader(header) => {
                        linktype = header.network.0;
                        debug!("{}: link type {}", path.display(), linktype);
                        false
                    }
                    PcapBlockOwned::Legacy(packet) => {
                        records += 1;
                        carries_eapol(linktype, packet.data)
                    }
                    PcapBlockOwned::NG(_) => false,
                };
                reader.consume(offset);
                stalled = false;

                if found {
                    debug!("{}: EAPOL frame in record {}", path.display(), records);
                    return Ok(());
                }
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                if stalled {
                    return Err(InvalidCapture::Malformed(format!(
                        "truncated record after {} records",
                        records
                    )));
                }
                reader
                    .refill()
                    .map_err(|e| InvalidCapture::Malformed(format!("{:?}", e)))?;
                stalled = true;
            }
            Err(e) => return Err(InvalidCapture::Malformed(format!("{:?}", e))),
        }
    }

    Err(InvalidCapture::NoHandshake { records })
}

/// Whether a captured frame of the given link type carries an EAPOL payload.
pub fn carries_eapol(linktype: i32, data: &[u8]) -> bool {
    match linktype {
        LINKTYPE_ETHERNET => ethernet_is_eapol(data),
        LINKTYPE_LINUX_SLL => eapol_follows(data, 14),
        LINKTYPE_LINUX_SLL2 => eapol_follows(data, 0),
        LINKTYPE_IEEE802_11 => dot11_is_eapol(data),
        // Radiotap and PPI both carry a little-endian u16 header length at offset 2
        LINKTYPE_IEEE802_11_RADIOTAP | LINKTYPE_PPI => read_u16_le(data, 2)
            .and_then(|len| data.get(len as usize..))
            .is_some_and(dot11_is_eapol),
        LINKTYPE_IEEE802_11_PRISM => read_u32(data, 4, false)
            .and_then(|len| data.get(len as usize..))
            .is_some_and(dot11_is_eapol),
        LINKTYPE_IEEE802_11_AVS => read_u32(data, 4, true)
            .and_then(|len| data.get(len as usize..))
            .is_some_and(dot11_is_eapol),
        _ => false,
    }
}

fn ethernet_is_eapol(frame: &[u8]) -> bool {
    let mut offset = 12;
    while let Some(ethertype) = read_u16_be(frame, offset) {
        if !ETHERTYPE_VLAN.contains(&ethertype) {
            break;
        }
        offset += 4;
    }
    eapol_follows(frame, offset)
}

/// EtherType `0x888E` at `offset`, followed by at least an EAPOL header.
fn eapol_follows(data: &[u8], offset: usize) -> bool {
    read_u16_be(data, offset) == Some(ETHERTYPE_EAPOL)
        && data.len() >= offset + 2 + EAPOL_HEADER_LEN
}

fn dot11_is_eapol(frame: &[u8]) -> bool {
    if frame.len() < 24 {
        return false;
    }

    let fc0 = frame[0];
    let fc1 = frame[1];

    // Data frames only (type 2)
    if (fc0 >> 2) & 0x3 != 2 {
        return false;
    }
    let subtype = (fc0 >> 4) & 0xF;
    // Null-data subtypes have no body
    if subtype & 0x4 != 0 {
        return false;
    }
    // Protected: the LLC header is encrypted
    if fc1 & 0x40 != 0 {
        return false;
    }

    let mut header_len = 24;
    // ToDS + FromDS: four-address (WDS) frame
    if fc1 & 0x03 == 0x03 {
        header_len += 6;
    }
    // QoS data, plus HT control when the order bit is set
    if subtype & 0x8 != 0 {
        header_len += 2;
        if fc1 & 0x80 != 0 {
            header_len += 4;
        }
    }

    frame.get(header_len..).is_some_and(|llc| {
        llc.len() >= LLC_SNAP_EAPOL.len() + EAPOL_HEADER_LEN
            && llc[..LLC_SNAP_EAPOL.len()] == LLC_SNAP_EAPOL
    })
}

fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], offset: usize, big_endian: bool) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(if big_endian {
        u32::from_be_bytes(bytes)
    } else {
        u32::from_le_bytes(bytes)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn put_u16(buf: &mut Vec<u8>, v: u16, big: bool) {
        buf.extend_from_slice(&if big { v.to_be_bytes() } else { v.to_le_bytes() });
    }

    fn put_u32(buf: &mut Vec<u8>, v: u32, big: bool) {
        buf.extend_from_slice(&if big { v.to_be_bytes() } else { v.to_le_bytes() });
    }

    fn pcap(big: bool, linktype: u32, records: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u32(&mut buf, 0xA1B2_C3D4, big);
        put_u16(&mut buf, 2, big);
        put_u16(&mut buf, 4, big);
        put_u32(&mut buf, 0, big);
        put_u32(&mut buf, 0, big);
        put_u32(&mut buf, 65535, big);
        put_u32(&mut buf, linktype, big);
        for (i, data) in records.iter().enumerate() {
            put_u32(&mut buf, 1_700_000_000 + i as u32, big);
            put_u32(&mut buf, 0, big);
            put_u32(&mut buf, data.len() as u32, big);
            put_u32(&mut buf, data.len() as u32, big);
            buf.extend_from_slice(data);
        }
        buf
    }

    fn eapol_key_body() -> Vec<u8> {
        let mut body = vec![0x02, 0x03, 0x00, 0x5F];
        body.extend(std::iter::repeat(0u8).take(0x5F));
        body
    }

    fn ethernet_frame(ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xFF; 6];
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    fn dot11_data_frame(fc: [u8; 2], qos: bool, payload: &[u8]) -> Vec<u8> {
        let mut frame = fc.to_vec();
        frame.extend_from_slice(&[0x00, 0x00]);
        frame.extend_from_slice(&[0xAA; 6]);
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.extend_from_slice(&[0x10, 0x00]);
        if qos {
            frame.extend_from_slice(&[0x00, 0x00]);
        }
        frame.extend_from_slice(&LLC_SNAP_EAPOL);
        frame.extend_from_slice(payload);
        frame
    }

    fn radiotap(inner: Vec<u8>) -> Vec<u8> {
        let mut frame = vec![0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
        frame.extend(inner);
        frame
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_empty_file_is_invalid() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "empty.pcap", b"");
        assert_eq!(validate(&path), Err(InvalidCapture::Empty));
        assert!(!is_valid_handshake(&path));
    }

    #[test]
    fn test_magic_gate_ignores_contents() {
        let tmp = tempdir().unwrap();
        let le = write(tmp.path(), "le.pcap", &[0xD4, 0xC3, 0xB2, 0xA1, 0xDE, 0xAD]);
        let be = write(tmp.path(), "be.pcap", &[0xA1, 0xB2, 0xC3, 0xD4]);
        assert_eq!(check_magic(&le), Ok(()));
        assert_eq!(check_magic(&be), Ok(()));
    }

    #[test]
    fn test_magic_gate_rejects_other_prefixes() {
        let tmp = tempdir().unwrap();
        // pcapng section header block
        let ng = write(tmp.path(), "ng.pcap", &[0x0A, 0x0D, 0x0D, 0x0A, 0, 0, 0, 0]);
        assert_eq!(
            validate(&ng),
            Err(InvalidCapture::BadMagic([0x0A, 0x0D, 0x0D, 0x0A]))
        );

        // nanosecond-resolution pcap is not accepted either
        let nanos = write(tmp.path(), "ns.pcap", &[0x4D, 0x3C, 0xB2, 0xA1, 0, 0]);
        assert!(matches!(validate(&nanos), Err(InvalidCapture::BadMagic(_))));

        let short = write(tmp.path(), "short.pcap", &[0xD4, 0xC3]);
        assert_eq!(validate(&short), Err(InvalidCapture::TooShort));
    }

    #[test]
    fn test_ethernet_eapol_is_valid() {
        let tmp = tempdir().unwrap();
        let records = vec![
            ethernet_frame(0x0800, &[0x45; 40]),
            ethernet_frame(ETHERTYPE_EAPOL, &eapol_key_body()),
        ];
        let path = write(tmp.path(), "eth.pcap", &pcap(false, 1, &records));
        assert_eq!(validate(&path), Ok(()));
        assert!(is_valid_handshake(&path));
    }

    #[test]
    fn test_big_endian_capture_is_valid() {
        let tmp = tempdir().unwrap();
        let records = vec![ethernet_frame(ETHERTYPE_EAPOL, &eapol_key_body())];
        let path = write(tmp.path(), "be.pcap", &pcap(true, 1, &records));
        assert_eq!(validate(&path), Ok(()));
    }

    #[test]
    fn test_no_eapol_reports_record_count() {
        let tmp = tempdir().unwrap();
        let records = vec![
            ethernet_frame(0x0800, &[0x45; 40]),
            ethernet_frame(0x86DD, &[0x60; 40]),
            ethernet_frame(0x0806, &[0x00; 28]),
        ];
        let path = write(tmp.path(), "ip.pcap", &pcap(false, 1, &records));
        assert_eq!(
            validate(&path),
            Err(InvalidCapture::NoHandshake { records: 3 })
        );
    }

    #[test]
    fn test_header_only_capture_has_no_handshake() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "hdr.pcap", &pcap(false, 1, &[]));
        assert_eq!(
            validate(&path),
            Err(InvalidCapture::NoHandshake { records: 0 })
        );
    }

    #[test]
    fn test_truncated_record_is_malformed() {
        let tmp = tempdir().unwrap();
        let mut bytes = pcap(false, 1, &[ethernet_frame(0x0800, &[0x45; 40])]);
        // Record header claiming 200 bytes with only 10 present
        put_u32(&mut bytes, 0, false);
        put_u32(&mut bytes, 0, false);
        put_u32(&mut bytes, 200, false);
        put_u32(&mut bytes, 200, false);
        bytes.extend_from_slice(&[0u8; 10]);
        let path = write(tmp.path(), "cut.pcap", &bytes);

        assert!(matches!(validate(&path), Err(InvalidCapture::Malformed(_))));
    }

    #[test]
    fn test_truncated_global_header_is_malformed() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "hdr_cut.pcap", &[0xD4, 0xC3, 0xB2, 0xA1, 0x02, 0x00]);
        assert!(matches!(validate(&path), Err(InvalidCapture::Malformed(_))));
    }

    #[test]
    fn test_radiotap_dot11_eapol_is_valid() {
        let tmp = tempdir().unwrap();
        let frame = radiotap(dot11_data_frame([0x08, 0x02], false, &eapol_key_body()));
        let path = write(tmp.path(), "rt.pcap", &pcap(false, 127, &[frame]));
        assert_eq!(validate(&path), Ok(()));
    }

    #[test]
    fn test_dot11_variants() {
        let body = eapol_key_body();
        assert!(carries_eapol(105, &dot11_data_frame([0x08, 0x01], false, &body)));
        assert!(carries_eapol(105, &dot11_data_frame([0x88, 0x01], true, &body)));
        // Protected frames are opaque
        assert!(!carries_eapol(105, &dot11_data_frame([0x08, 0x41], false, &body)));
        // Management frame (beacon)
        assert!(!carries_eapol(105, &dot11_data_frame([0x80, 0x00], false, &body)));
        // Truncated
        assert!(!carries_eapol(105, &[0x08, 0x01, 0x00]));
    }

    #[test]
    fn test_vlan_tagged_and_cooked_frames() {
        let body = eapol_key_body();

        let mut tagged = vec![0xFF; 12];
        tagged.extend_from_slice(&[0x81, 0x00, 0x00, 0x0A]);
        tagged.extend_from_slice(&ETHERTYPE_EAPOL.to_be_bytes());
        tagged.extend_from_slice(&body);
        assert!(carries_eapol(LINKTYPE_ETHERNET, &tagged));

        let mut sll = vec![0u8; 14];
        sll.extend_from_slice(&ETHERTYPE_EAPOL.to_be_bytes());
        sll.extend_from_slice(&body);
        assert!(carries_eapol(LINKTYPE_LINUX_SLL, &sll));

        // Unknown link types never match
        assert!(!carries_eapol(228, &sll));
    }
}
