/// STL file parser for binary and ASCII formats
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::MeshError;
use crate::mesh::{FaceVertex, Mesh};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

struct Facet {
    normal: Vector3<f32>,
    vertices: [Point3<f32>; 3],
}

/// STL carries one normal per facet and no texture coordinates
fn mesh_from_facets(facets: impl IntoIterator<Item = Facet>) -> Mesh {
    let facets = facets.into_iter();
    let mut mesh = Mesh::with_capacity(facets.size_hint().0 * 3, facets.size_hint().0);
    for facet in facets {
        let n = mesh.push_normal(facet.normal);
        let corners = facet
            .vertices
            .map(|v| FaceVertex::new(mesh.push_position(v), None, Some(n)));
        mesh.push_face(corners);
    }
    mesh
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_vec3(data: &[u8], offset: usize) -> (f32, f32, f32) {
    (read_f32(data, offset), read_f32(data, offset + 4), read_f32(data, offset + 8))
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(MeshError::parse(0, "file too small to be a valid STL"));
    }

    // Skip 80-byte header, then read the little-endian triangle count
    let data = &data[HEADER_LEN..];
    let triangle_count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

    let body = &data[4..];
    if body.len() < triangle_count * FACET_LEN {
        return Err(MeshError::parse(
            0,
            format!("expected {triangle_count} facets, found {}", body.len() / FACET_LEN),
        ));
    }

    let facets = body.chunks_exact(FACET_LEN).take(triangle_count).map(|chunk| {
        let (nx, ny, nz) = read_vec3(chunk, 0);
        let vertex = |i: usize| {
            let (x, y, z) = read_vec3(chunk, 12 + i * 12);
            Point3::new(x, y, z)
        };
        // The trailing 2-byte attribute count is ignored
        Facet {
            normal: Vector3::new(nx, ny, nz),
            vertices: [vertex(0), vertex(1), vertex(2)],
        }
    });

    Ok(mesh_from_facets(facets))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, MeshError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, facets)) => Ok(mesh_from_facets(facets)),
        Err(e) => Err(MeshError::parse(0, format!("failed to parse ASCII STL: {e:?}"))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, facets) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    Ok((input, facets))
}

fn parse_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, (nx, ny, nz)) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((
        input,
        Facet {
            normal: Vector3::new(nx, ny, nz),
            vertices: [v1, v2, v3],
        },
    ))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, MeshError> {
    // Binary files may also start with "solid", so fall back on failure
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_triangle() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&1u32.to_le_bytes());
        for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&[0, 0]);
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn test_parse_binary_triangle() {
        let mesh = parse_stl(&binary_triangle()).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex(0, 1), Point3::new(1.0, 0.0, 0.0));
        assert!((mesh.normal(0, 0) - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = binary_triangle();
        data.truncate(100);
        assert!(parse_binary_stl(&data).is_err());
    }

    #[test]
    fn test_parse_ascii() {
        let src = "solid wedge
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid wedge
";
        let mesh = parse_stl(src.as_bytes()).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.vertex(0, 2), Point3::new(0.0, 1.0, 0.0));
    }
}
