//! Hand-built JPEG payloads for metadata tests.

#![allow(dead_code)]

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}

/// Little-endian TIFF block with Make in IFD0 and ExposureTime, FNumber and
/// ISO in the Exif sub-IFD.
fn tiff(make: &str, iso: u16, f_number: (u32, u32), exposure: (u32, u32)) -> Vec<u8> {
    let mut make_bytes = make.as_bytes().to_vec();
    make_bytes.push(0);
    assert!(make_bytes.len() > 4, "short strings would be stored inline");

    let ifd0_off: u32 = 8;
    let make_off = ifd0_off + 2 + 2 * 12 + 4;
    let exif_ifd_off = (make_off + make_bytes.len() as u32 + 1) & !1;
    let exposure_off = exif_ifd_off + 2 + 3 * 12 + 4;
    let f_number_off = exposure_off + 8;

    let mut b = Vec::new();
    b.extend_from_slice(b"II");
    b.extend_from_slice(&42u16.to_le_bytes());
    b.extend_from_slice(&ifd0_off.to_le_bytes());

    b.extend_from_slice(&2u16.to_le_bytes());
    entry(&mut b, 0x010F, ASCII, make_bytes.len() as u32, make_off);
    entry(&mut b, 0x8769, LONG, 1, exif_ifd_off);
    b.extend_from_slice(&0u32.to_le_bytes());
    b.extend_from_slice(&make_bytes);
    b.resize(exif_ifd_off as usize, 0);

    b.extend_from_slice(&3u16.to_le_bytes());
    entry(&mut b, 0x829A, RATIONAL, 1, exposure_off);
    entry(&mut b, 0x829D, RATIONAL, 1, f_number_off);
    entry(&mut b, 0x8827, SHORT, 1, u32::from(iso));
    b.extend_from_slice(&0u32.to_le_bytes());

    for (num, denom) in [exposure, f_number] {
        b.extend_from_slice(&num.to_le_bytes());
        b.extend_from_slice(&denom.to_le_bytes());
    }
    b
}

fn jpeg_with_app1(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let len = u16::try_from(2 + 6 + payload.len()).unwrap();
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// JPEG carrying ISO 400, f/2.8 and 1/250s.
pub fn jpeg_with_exif() -> Vec<u8> {
    jpeg_with_app1(&tiff("FUJIFILM", 400, (28, 10), (1, 250)))
}

/// JPEG with no APP1 segment at all.
pub fn jpeg_without_exif() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xD9]
}

/// JPEG whose Exif segment points its first IFD past the end of the data.
pub fn jpeg_with_corrupt_exif() -> Vec<u8> {
    jpeg_with_app1(b"II\x2a\x00\xff\xff\x00\x00garbage")
}
