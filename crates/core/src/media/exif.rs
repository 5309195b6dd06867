//! Minimal EXIF writer/reader for GPS tags in JPEG files.
//!
//! Injection rewrites only the APP1 `Exif` segment: IFD0 entries of an
//! existing block are kept (sub-IFD pointers and the thumbnail IFD are
//! dropped since their offsets cannot be relocated blindly), a fresh GPS IFD
//! is attached, and every other byte of the file is copied verbatim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;
const TAG_INTEROP_IFD: u16 = 0xA005;

const GPS_VERSION_ID: u16 = 0x0000;
const GPS_LATITUDE_REF: u16 = 0x0001;
const GPS_LATITUDE: u16 = 0x0002;
const GPS_LONGITUDE_REF: u16 = 0x0003;
const GPS_LONGITUDE: u16 = 0x0004;

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExifError {
    #[error("not a JPEG file")]
    NotJpeg,
    #[error("JPEG segment structure is truncated")]
    Truncated,
    #[error("EXIF block is malformed: {0}")]
    Malformed(&'static str),
    #[error("EXIF block exceeds the 64 KiB segment limit")]
    TooLarge,
    #[error("coordinate out of range: latitude {latitude}, longitude {longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },
}

/// Decimal-degree position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Used when an image is tagged without a configured location
    /// (downtown Los Angeles).
    pub const FALLBACK: GpsCoordinate = GpsCoordinate {
        latitude: 34.052235,
        longitude: -118.243683,
    };

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ExifError> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !in_range {
            return Err(ExifError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude_ref(&self) -> char {
        if self.latitude >= 0.0 {
            'N'
        } else {
            'S'
        }
    }

    pub fn longitude_ref(&self) -> char {
        if self.longitude >= 0.0 {
            'E'
        } else {
            'W'
        }
    }
}

impl Default for GpsCoordinate {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Unsigned rational as stored in TIFF.
pub type Rational = (u32, u32);

/// Degrees, minutes and seconds (to 1/100 s) of an absolute decimal value.
pub fn to_dms(decimal: f64) -> [Rational; 3] {
    let total_hundredths = (decimal.abs() * 360_000.0).round() as u64;
    let degrees = total_hundredths / 360_000;
    let minutes = (total_hundredths % 360_000) / 6_000;
    let hundredths = total_hundredths % 6_000;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        (hundredths as u32, 100),
    ]
}

fn from_dms(dms: &[Rational; 3]) -> f64 {
    let part = |(n, d): Rational| if d == 0 { 0.0 } else { n as f64 / d as f64 };
    part(dms[0]) + part(dms[1]) / 60.0 + part(dms[2]) / 3600.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Big,
    Little,
}

impl Endian {
    fn u16(self, b: &[u8]) -> u16 {
        let arr = [b[0], b[1]];
        match self {
            Endian::Big => u16::from_be_bytes(arr),
            Endian::Little => u16::from_le_bytes(arr),
        }
    }

    fn u32(self, b: &[u8]) -> u32 {
        let arr = [b[0], b[1], b[2], b[3]];
        match self {
            Endian::Big => u32::from_be_bytes(arr),
            Endian::Little => u32::from_le_bytes(arr),
        }
    }

    fn put_u16(self, out: &mut Vec<u8>, v: u16) {
        match self {
            Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
            Endian::Little => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn put_u32(self, out: &mut Vec<u8>, v: u32) {
        match self {
            Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
            Endian::Little => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// An IFD entry with its value bytes already in the block's byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    fn ascii(tag: u16, c: char) -> Self {
        Self {
            tag,
            kind: TYPE_ASCII,
            count: 2,
            data: vec![c as u8, 0],
        }
    }

    fn rationals(endian: Endian, tag: u16, values: &[Rational]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for (n, d) in values {
            endian.put_u32(&mut data, *n);
            endian.put_u32(&mut data, *d);
        }
        Self {
            tag,
            kind: TYPE_RATIONAL,
            count: values.len() as u32,
            data,
        }
    }

    fn long(endian: Endian, tag: u16, value: u32) -> Self {
        let mut data = Vec::with_capacity(4);
        endian.put_u32(&mut data, value);
        Self {
            tag,
            kind: TYPE_LONG,
            count: 1,
            data,
        }
    }
}

fn type_size(kind: u16) -> Option<usize> {
    match kind {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// Bytes an IFD occupies including its out-of-line values.
fn ifd_size(entries: &[Entry]) -> usize {
    let overflow: usize = entries
        .iter()
        .filter(|e| e.data.len() > 4)
        .map(|e| e.data.len() + e.data.len() % 2)
        .sum();
    2 + entries.len() * 12 + 4 + overflow
}

/// Serialise an IFD placed at `start` (offset from the TIFF header), with its
/// out-of-line values directly after it.
fn write_ifd(endian: Endian, entries: &[Entry], start: usize, out: &mut Vec<u8>) {
    let mut data_offset = start + 2 + entries.len() * 12 + 4;
    let mut overflow = Vec::new();

    endian.put_u16(out, entries.len() as u16);
    for e in entries {
        endian.put_u16(out, e.tag);
        endian.put_u16(out, e.kind);
        endian.put_u32(out, e.count);
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            endian.put_u32(out, data_offset as u32);
            overflow.extend_from_slice(&e.data);
            if e.data.len() % 2 == 1 {
                overflow.push(0);
            }
            data_offset += e.data.len() + e.data.len() % 2;
        }
    }
    endian.put_u32(out, 0);
    out.extend_from_slice(&overflow);
}

fn build_tiff(endian: Endian, mut ifd0: Vec<Entry>, gps: &[Entry]) -> Vec<u8> {
    // Pointer entry is 4 bytes inline, so the size is known before its value.
    ifd0.push(Entry::long(endian, TAG_GPS_IFD, 0));
    ifd0.sort_by_key(|e| e.tag);
    let gps_start = 8 + ifd_size(&ifd0);
    if let Some(ptr) = ifd0.iter_mut().find(|e| e.tag == TAG_GPS_IFD) {
        *ptr = Entry::long(endian, TAG_GPS_IFD, gps_start as u32);
    }

    let mut out = Vec::with_capacity(gps_start + ifd_size(gps));
    match endian {
        Endian::Big => out.extend_from_slice(b"MM"),
        Endian::Little => out.extend_from_slice(b"II"),
    }
    endian.put_u16(&mut out, 42);
    endian.put_u32(&mut out, 8);
    write_ifd(endian, &ifd0, 8, &mut out);
    write_ifd(endian, gps, gps_start, &mut out);
    out
}

fn gps_entries(endian: Endian, coord: &GpsCoordinate) -> Vec<Entry> {
    vec![
        Entry {
            tag: GPS_VERSION_ID,
            kind: TYPE_BYTE,
            count: 4,
            data: vec![2, 3, 0, 0],
        },
        Entry::ascii(GPS_LATITUDE_REF, coord.latitude_ref()),
        Entry::rationals(endian, GPS_LATITUDE, &to_dms(coord.latitude)),
        Entry::ascii(GPS_LONGITUDE_REF, coord.longitude_ref()),
        Entry::rationals(endian, GPS_LONGITUDE, &to_dms(coord.longitude)),
    ]
}

struct Tiff<'a> {
    endian: Endian,
    bytes: &'a [u8],
}

impl<'a> Tiff<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self, ExifError> {
        if bytes.len() < 8 {
            return Err(ExifError::Malformed("TIFF header too short"));
        }
        let endian = match &bytes[..2] {
            b"MM" => Endian::Big,
            b"II" => Endian::Little,
            _ => return Err(ExifError::Malformed("unknown byte order")),
        };
        if endian.u16(&bytes[2..4]) != 42 {
            return Err(ExifError::Malformed("bad TIFF magic"));
        }
        Ok(Self { endian, bytes })
    }

    fn ifd0_offset(&self) -> usize {
        self.endian.u32(&self.bytes[4..8]) as usize
    }

    fn read_ifd(&self, offset: usize) -> Result<Vec<Entry>, ExifError> {
        let b = self.bytes;
        let count_bytes = b.get(offset..offset + 2).ok_or(ExifError::Truncated)?;
        let count = self.endian.u16(count_bytes) as usize;
        let mut entries = Vec::with_capacity(count);

        for i in 0..count {
            let at = offset + 2 + i * 12;
            let raw = b.get(at..at + 12).ok_or(ExifError::Truncated)?;
            let tag = self.endian.u16(&raw[0..2]);
            let kind = self.endian.u16(&raw[2..4]);
            let entry_count = self.endian.u32(&raw[4..8]);
            let Some(size) = type_size(kind).map(|s| s * entry_count as usize) else {
                continue;
            };
            let data = if size <= 4 {
                raw[8..8 + size].to_vec()
            } else {
                let at = self.endian.u32(&raw[8..12]) as usize;
                b.get(at..at + size).ok_or(ExifError::Truncated)?.to_vec()
            };
            entries.push(Entry {
                tag,
                kind,
                count: entry_count,
                data,
            });
        }
        Ok(entries)
    }

    fn rationals(&self, entry: &Entry) -> Option<[Rational; 3]> {
        if entry.kind != TYPE_RATIONAL || entry.count != 3 {
            return None;
        }
        let r = |i: usize| {
            (
                self.endian.u32(&entry.data[i * 8..]),
                self.endian.u32(&entry.data[i * 8 + 4..]),
            )
        };
        Some([r(0), r(1), r(2)])
    }
}

struct Segment {
    marker: u8,
    start: usize,
    end: usize,
}

/// Marker segments before the scan data, and the offset where the scan starts.
fn segments(jpeg: &[u8]) -> Result<(Vec<Segment>, usize), ExifError> {
    if jpeg.len() < 4 || jpeg[..2] != SOI {
        return Err(ExifError::NotJpeg);
    }
    let mut out = Vec::new();
    let mut pos = 2;
    loop {
        let header = jpeg.get(pos..pos + 4).ok_or(ExifError::Truncated)?;
        if header[0] != 0xFF {
            return Err(ExifError::Truncated);
        }
        let marker = header[1];
        if marker == SOS {
            return Ok((out, pos));
        }
        let len = u16::from_be_bytes([header[2], header[3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(ExifError::Truncated);
        }
        out.push(Segment {
            marker,
            start: pos,
            end,
        });
        pos = end;
    }
}

fn is_exif(jpeg: &[u8], seg: &Segment) -> bool {
    seg.marker == APP1 && jpeg[seg.start + 4..seg.end].starts_with(EXIF_HEADER)
}

fn tiff_of<'a>(jpeg: &'a [u8], seg: &Segment) -> &'a [u8] {
    &jpeg[seg.start + 4 + EXIF_HEADER.len()..seg.end]
}

/// Embed `coord` as GPS tags, returning a new file.
pub fn inject_gps(jpeg: &[u8], coord: &GpsCoordinate) -> Result<Vec<u8>, ExifError> {
    let coord = GpsCoordinate::new(coord.latitude, coord.longitude)?;
    let (segs, scan_start) = segments(jpeg)?;
    let existing = segs.iter().find(|s| is_exif(jpeg, s));

    let (endian, ifd0) = match existing {
        Some(seg) => {
            let tiff = Tiff::parse(tiff_of(jpeg, seg))?;
            let entries = tiff
                .read_ifd(tiff.ifd0_offset())?
                .into_iter()
                .filter(|e| !matches!(e.tag, TAG_GPS_IFD | TAG_EXIF_IFD | TAG_INTEROP_IFD))
                .collect();
            (tiff.endian, entries)
        }
        None => (Endian::Big, Vec::new()),
    };

    let tiff = build_tiff(endian, ifd0, &gps_entries(endian, &coord));
    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    if segment_len > u16::MAX as usize {
        return Err(ExifError::TooLarge);
    }

    let mut app1 = Vec::with_capacity(segment_len + 2);
    app1.extend_from_slice(&[0xFF, APP1]);
    app1.extend_from_slice(&(segment_len as u16).to_be_bytes());
    app1.extend_from_slice(EXIF_HEADER);
    app1.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&SOI);
    let after_jfif = segs.first().is_some_and(|s| s.marker == APP0);
    if !after_jfif {
        out.extend_from_slice(&app1);
    }
    for (i, seg) in segs.iter().enumerate() {
        if is_exif(jpeg, seg) {
            continue;
        }
        out.extend_from_slice(&jpeg[seg.start..seg.end]);
        if i == 0 && after_jfif {
            out.extend_from_slice(&app1);
        }
    }
    out.extend_from_slice(&jpeg[scan_start..]);
    Ok(out)
}

/// Read back the GPS position of a JPEG, if it carries one.
pub fn read_gps(jpeg: &[u8]) -> Result<Option<GpsCoordinate>, ExifError> {
    let (segs, _) = segments(jpeg)?;
    let Some(seg) = segs.iter().find(|s| is_exif(jpeg, s)) else {
        return Ok(None);
    };
    let tiff = Tiff::parse(tiff_of(jpeg, seg))?;
    let ifd0 = tiff.read_ifd(tiff.ifd0_offset())?;
    let Some(ptr) = ifd0.iter().find(|e| e.tag == TAG_GPS_IFD) else {
        return Ok(None);
    };
    if ptr.data.len() != 4 {
        return Err(ExifError::Malformed("GPS pointer is not a LONG"));
    }
    let gps = tiff.read_ifd(tiff.endian.u32(&ptr.data) as usize)?;

    let find = |tag| gps.iter().find(|e| e.tag == tag);
    let (Some(lat_ref), Some(lat), Some(lon_ref), Some(lon)) = (
        find(GPS_LATITUDE_REF),
        find(GPS_LATITUDE).and_then(|e| tiff.rationals(e)),
        find(GPS_LONGITUDE_REF),
        find(GPS_LONGITUDE).and_then(|e| tiff.rationals(e)),
    ) else {
        return Ok(None);
    };

    let sign = |entry: &Entry, negative: u8| {
        if entry.data.first() == Some(&negative) {
            -1.0
        } else {
            1.0
        }
    };
    Ok(Some(GpsCoordinate {
        latitude: sign(lat_ref, b'S') * from_dms(&lat),
        longitude: sign(lon_ref, b'W') * from_dms(&lon),
    }))
}
