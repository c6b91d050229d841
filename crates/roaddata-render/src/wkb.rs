//! Well-known binary geometry decoding.
//!
//! Accepts plain OGC WKB, PostGIS EWKB (SRID/Z/M flag bits in the type word)
//! and ISO WKB (Z/M encoded as +1000/+2000/+3000 type offsets). Z and M
//! ordinates are read and discarded; the map is strictly 2D.

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use roaddata_core::Value;
use thiserror::Error;

/// Collections nested deeper than this are rejected rather than recursed into.
const MAX_DEPTH: usize = 32;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WkbError {
    #[error("geometry value is NULL")]
    Null,

    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },

    #[error("invalid byte order marker {0:#04x}")]
    InvalidByteOrder(u8),

    #[error("unsupported geometry type {0}")]
    UnsupportedType(u32),

    #[error("geometry collections nested too deeply")]
    TooDeep,

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
}

pub type Result<T> = std::result::Result<T, WkbError>;

/// Decode a geometry from a column value: raw bytes, or hex text as returned
/// by PostgreSQL's text protocol (`0102...` or `\x0102...`).
pub fn decode_value(value: &Value) -> Result<Geometry<f64>> {
    match value {
        Value::Null => Err(WkbError::Null),
        Value::Bytes(bytes) => decode(bytes),
        Value::Text(text) => decode_hex(text),
    }
}

pub fn decode_hex(text: &str) -> Result<Geometry<f64>> {
    let text = text.trim();
    let digits = text
        .strip_prefix("\\x")
        .or_else(|| text.strip_prefix("0x"))
        .unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|e| WkbError::InvalidHex(e.to_string()))?;
    decode(&bytes)
}

/// Decode a single geometry. Bytes after the geometry are ignored.
pub fn decode(bytes: &[u8]) -> Result<Geometry<f64>> {
    Reader::new(bytes).geometry(0)
}

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    order: ByteOrder,
    base_type: u32,
    dims: usize,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or(WkbError::UnexpectedEof { offset: self.pos })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self, order: ByteOrder) -> Result<u32> {
        let raw = self.take::<4>()?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
        })
    }

    fn f64(&mut self, order: ByteOrder) -> Result<f64> {
        let raw = self.take::<8>()?;
        Ok(match order {
            ByteOrder::Big => f64::from_be_bytes(raw),
            ByteOrder::Little => f64::from_le_bytes(raw),
        })
    }

    /// Element count, checked against the bytes left so a corrupt count
    /// cannot trigger a huge allocation.
    fn count(&mut self, order: ByteOrder, min_item_bytes: usize) -> Result<usize> {
        let n = self.u32(order)? as usize;
        if n.saturating_mul(min_item_bytes) > self.remaining() {
            return Err(WkbError::UnexpectedEof { offset: self.buf.len() });
        }
        Ok(n)
    }

    fn header(&mut self) -> Result<Header> {
        let order = match self.take::<1>()?[0] {
            0 => ByteOrder::Big,
            1 => ByteOrder::Little,
            other => return Err(WkbError::InvalidByteOrder(other)),
        };
        let raw = self.u32(order)?;
        let mut has_z = raw & EWKB_Z != 0;
        let mut has_m = raw & EWKB_M != 0;
        let code = raw & 0x0FFF_FFFF;
        match code / 1000 {
            0 => {}
            1 => has_z = true,
            2 => has_m = true,
            3 => {
                has_z = true;
                has_m = true;
            }
            _ => return Err(WkbError::UnsupportedType(raw)),
        }
        if raw & EWKB_SRID != 0 {
            self.u32(order)?;
        }
        Ok(Header {
            order,
            base_type: code % 1000,
            dims: 2 + usize::from(has_z) + usize::from(has_m),
        })
    }

    fn coord(&mut self, header: Header) -> Result<Coord<f64>> {
        let x = self.f64(header.order)?;
        let y = self.f64(header.order)?;
        for _ in 2..header.dims {
            self.f64(header.order)?;
        }
        Ok(Coord { x, y })
    }

    fn line_string(&mut self, header: Header) -> Result<LineString<f64>> {
        let n = self.count(header.order, header.dims * 8)?;
        let coords = (0..n)
            .map(|_| self.coord(header))
            .collect::<Result<Vec<_>>>()?;
        Ok(LineString::new(coords))
    }

    fn polygon(&mut self, header: Header) -> Result<Polygon<f64>> {
        let rings = self.count(header.order, 4)?;
        let mut rings = (0..rings)
            .map(|_| self.line_string(header))
            .collect::<Result<Vec<_>>>()?;
        if rings.is_empty() {
            return Ok(Polygon::new(LineString::new(Vec::new()), Vec::new()));
        }
        let exterior = rings.remove(0);
        Ok(Polygon::new(exterior, rings))
    }

    fn members(&mut self, header: Header, depth: usize) -> Result<Vec<Geometry<f64>>> {
        let n = self.count(header.order, 5)?;
        (0..n).map(|_| self.geometry(depth + 1)).collect()
    }

    fn geometry(&mut self, depth: usize) -> Result<Geometry<f64>> {
        if depth > MAX_DEPTH {
            return Err(WkbError::TooDeep);
        }
        let header = self.header()?;
        let geometry = match header.base_type {
            1 => Geometry::Point(Point::from(self.coord(header)?)),
            2 => Geometry::LineString(self.line_string(header)?),
            3 => Geometry::Polygon(self.polygon(header)?),
            4 => Geometry::MultiPoint(MultiPoint(
                self.members(header, depth)?
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::Point(p) => Some(p),
                        _ => None,
                    })
                    .collect(),
            )),
            5 => Geometry::MultiLineString(MultiLineString(
                self.members(header, depth)?
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::LineString(l) => Some(l),
                        _ => None,
                    })
                    .collect(),
            )),
            6 => Geometry::MultiPolygon(MultiPolygon(
                self.members(header, depth)?
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::Polygon(p) => Some(p),
                        _ => None,
                    })
                    .collect(),
            )),
            7 => Geometry::GeometryCollection(GeometryCollection(self.members(header, depth)?)),
            other => return Err(WkbError::UnsupportedType(other)),
        };
        Ok(geometry)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Little-endian WKB LineString.
    pub(crate) fn line_wkb(coords: &[(f64, f64)]) -> Vec<u8> {
        let mut out = vec![1u8];
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(coords.len() as u32).to_le_bytes());
        for (x, y) in coords {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        }
        out
    }

    pub(crate) fn point_wkb(x: f64, y: f64) -> Vec<u8> {
        let mut out = vec![1u8];
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
        out
    }

    fn big_endian_line(coords: &[(f64, f64)]) -> Vec<u8> {
        let mut out = vec![0u8];
        out.extend_from_slice(&2u32.to_be_bytes());
        out.extend_from_slice(&(coords.len() as u32).to_be_bytes());
        for (x, y) in coords {
            out.extend_from_slice(&x.to_be_bytes());
            out.extend_from_slice(&y.to_be_bytes());
        }
        out
    }

    fn as_line(g: Geometry<f64>) -> LineString<f64> {
        match g {
            Geometry::LineString(l) => l,
            other => panic!("expected LineString, got {other:?}"),
        }
    }

    #[test]
    fn decodes_little_and_big_endian_lines() {
        let coords = [(116.3, 39.9), (116.4, 40.0), (116.5, 40.1)];
        for bytes in [line_wkb(&coords), big_endian_line(&coords)] {
            let line = as_line(decode(&bytes).unwrap());
            assert_eq!(line.0.len(), 3);
            assert_eq!(line.0[2], Coord { x: 116.5, y: 40.1 });
        }
    }

    #[test]
    fn decodes_postgis_ewkb_with_srid_and_z() {
        // LINESTRING Z with SRID 4326, as PostGIS emits it.
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&(2 | EWKB_Z | EWKB_SRID).to_le_bytes());
        bytes.extend_from_slice(&4326u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for v in [1.0f64, 2.0, 99.0, 3.0, 4.0, 99.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let line = as_line(decode(&bytes).unwrap());
        assert_eq!(line.0, vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 3.0, y: 4.0 }]);
    }

    #[test]
    fn decodes_iso_measured_line() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&2002u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for v in [0.0f64, 0.0, 7.0, 1.0, 1.0, 8.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(as_line(decode(&bytes).unwrap()).0.len(), 2);
    }

    #[test]
    fn decodes_hex_text_with_and_without_prefix() {
        let hex = hex::encode(line_wkb(&[(0.0, 0.0), (1.0, 1.0)]));
        assert!(decode_hex(&hex).is_ok());
        assert!(decode_hex(&format!("\\x{hex}")).is_ok());
        assert!(decode_value(&Value::Text(hex.to_uppercase())).is_ok());
        assert!(matches!(
            decode_hex("not hex at all"),
            Err(WkbError::InvalidHex(_))
        ));
    }

    #[test]
    fn decodes_multilinestring_members() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend(line_wkb(&[(0.0, 0.0), (1.0, 0.0)]));
        bytes.extend(line_wkb(&[(2.0, 0.0), (3.0, 0.0)]));
        match decode(&bytes).unwrap() {
            Geometry::MultiLineString(m) => assert_eq!(m.0.len(), 2),
            other => panic!("expected MultiLineString, got {other:?}"),
        }
    }

    #[test]
    fn decodes_point() {
        assert_eq!(
            decode(&point_wkb(3.0, 4.0)).unwrap(),
            Geometry::Point(Point::new(3.0, 4.0))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(decode(&[]), Err(WkbError::UnexpectedEof { offset: 0 }));
        assert_eq!(decode(&[7, 2, 0, 0, 0]), Err(WkbError::InvalidByteOrder(7)));

        let mut truncated = line_wkb(&[(0.0, 0.0), (1.0, 1.0)]);
        truncated.truncate(truncated.len() - 3);
        assert!(matches!(
            decode(&truncated),
            Err(WkbError::UnexpectedEof { .. })
        ));

        let mut unknown = vec![1u8];
        unknown.extend_from_slice(&17u32.to_le_bytes());
        assert_eq!(decode(&unknown), Err(WkbError::UnsupportedType(17)));

        assert_eq!(decode_value(&Value::Null), Err(WkbError::Null));
    }

    #[test]
    fn huge_count_does_not_allocate() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(WkbError::UnexpectedEof { .. })));
    }
}
