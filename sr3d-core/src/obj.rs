/// Wavefront OBJ parser for positions, texture coordinates, normals and faces
use nalgebra::{Point2, Point3, Vector3};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{all_consuming, map, opt},
    multi::separated_list1,
    number::complete::float,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::MeshError;
use crate::mesh::{FaceVertex, Mesh};

/// One face corner as written in the file: 1-based or negative indices
type RawCorner = (i64, Option<i64>, Option<i64>);

enum ObjLine {
    Position(Point3<f32>),
    TexCoord(Point2<f32>),
    Normal(Vector3<f32>),
    Face(Vec<RawCorner>),
}

/// Parse OBJ source text into a triangle mesh.
///
/// Polygons are fan-triangulated. Statements other than `v`, `vt`, `vn` and
/// `f` (groups, materials, smoothing) are skipped.
pub fn parse_obj(input: &str) -> Result<Mesh, MeshError> {
    let mut mesh = Mesh::new();
    let mut uv_count = 0usize;
    let mut normal_count = 0usize;

    for (number, raw) in input.lines().enumerate() {
        let line_no = number + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if !is_geometry_statement(line) {
            continue;
        }

        let (_, parsed) = parse_line(line)
            .map_err(|e| MeshError::parse(line_no, format!("malformed statement '{line}': {e:?}")))?;

        match parsed {
            ObjLine::Position(p) => {
                mesh.push_position(p);
            }
            ObjLine::TexCoord(uv) => {
                mesh.push_uv(uv);
                uv_count += 1;
            }
            ObjLine::Normal(n) => {
                mesh.push_normal(n);
                normal_count += 1;
            }
            ObjLine::Face(raw_corners) => {
                if raw_corners.len() < 3 {
                    return Err(MeshError::parse(line_no, "face needs at least three vertices"));
                }
                let corners = raw_corners
                    .into_iter()
                    .map(|(p, uv, n)| {
                        Ok(FaceVertex::new(
                            resolve_index(p, mesh.vertex_count(), line_no)?,
                            uv.map(|i| resolve_index(i, uv_count, line_no)).transpose()?,
                            n.map(|i| resolve_index(i, normal_count, line_no)).transpose()?,
                        ))
                    })
                    .collect::<Result<Vec<_>, MeshError>>()?;

                for i in 1..corners.len() - 1 {
                    mesh.push_face([corners[0], corners[i], corners[i + 1]]);
                }
            }
        }
    }

    Ok(mesh)
}

fn is_geometry_statement(line: &str) -> bool {
    let keyword = line.split_whitespace().next().unwrap_or_default();
    matches!(keyword, "v" | "vt" | "vn" | "f")
}

/// Convert an OBJ index (1-based, negative counts back from the end)
fn resolve_index(index: i64, count: usize, line: usize) -> Result<usize, MeshError> {
    let resolved = if index > 0 {
        index - 1
    } else {
        count as i64 + index
    };
    if index == 0 || resolved < 0 || resolved >= count as i64 {
        return Err(MeshError::parse(
            line,
            format!("index {index} out of range ({count} available)"),
        ));
    }
    Ok(resolved as usize)
}

fn parse_line(input: &str) -> IResult<&str, ObjLine> {
    all_consuming(terminated(
        alt((
            map(preceded(pair(tag("vt"), space1), parse_vector2), ObjLine::TexCoord),
            map(preceded(pair(tag("vn"), space1), parse_vector3), |(x, y, z)| {
                ObjLine::Normal(Vector3::new(x, y, z))
            }),
            map(preceded(pair(tag("v"), space1), parse_vector3), |(x, y, z)| {
                ObjLine::Position(Point3::new(x, y, z))
            }),
            map(
                preceded(pair(tag("f"), space1), separated_list1(space1, parse_corner)),
                ObjLine::Face,
            ),
        )),
        space0,
    ))(input)
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    // An optional fourth component (w) is accepted and ignored
    let (input, xyz) = tuple((float, preceded(space1, float), preceded(space1, float)))(input)?;
    let (input, _) = opt(preceded(space1, float))(input)?;
    Ok((input, xyz))
}

fn parse_vector2(input: &str) -> IResult<&str, Point2<f32>> {
    let (input, (u, v)) = pair(float, opt(preceded(space1, float)))(input)?;
    let (input, _) = opt(preceded(space1, float))(input)?;
    Ok((input, Point2::new(u, v.unwrap_or(0.0))))
}

/// `p`, `p/t`, `p//n` or `p/t/n`
fn parse_corner(input: &str) -> IResult<&str, RawCorner> {
    let (input, position) = integer(input)?;
    let (input, uv) = opt(preceded(char('/'), opt(integer)))(input)?;
    let (input, normal) = opt(preceded(char('/'), integer))(input)?;
    Ok((input, (position, uv.flatten(), normal)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
# a single textured triangle
o tri
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
usemtl none
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn test_parse_triangle() {
        let mesh = parse_obj(TRIANGLE).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.uv(0, 1), Point2::new(1.0, 0.0));
        assert!((mesh.normal(0, 2) - Vector3::z()).norm() < 1e-6);
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = parse_obj(src).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.faces()[1][0].position, 0);
        assert_eq!(mesh.faces()[1][1].position, 2);
        assert_eq!(mesh.faces()[1][2].position, 3);
    }

    #[test]
    fn test_corner_forms() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nvn 0 0 1\nf 1//1 2/1 -1/1/1\n";
        let mesh = parse_obj(src).unwrap();
        let face = mesh.faces()[0];
        assert_eq!(face[0], FaceVertex::new(0, None, Some(0)));
        assert_eq!(face[1], FaceVertex::new(1, Some(0), None));
        assert_eq!(face[2], FaceVertex::new(2, Some(0), Some(0)));
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let src = "v 0 0 0\nv 1 0 0\n\nf 1 2 3\n";
        match parse_obj(src) {
            Err(MeshError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_vertex() {
        assert!(matches!(
            parse_obj("v 1.0 nope 2.0\n"),
            Err(MeshError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_source() {
        let mesh = parse_obj("# nothing here\n").unwrap();
        assert_eq!(mesh.vertex_count(), 0);
    }
}
