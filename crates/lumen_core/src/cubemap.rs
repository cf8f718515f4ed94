//! Skybox cubemap loading and lookup.
//!
//! Six face images are decoded once at startup with the `image` crate and
//! kept as 8-bit channel data. Lookups pick the face by the dominant axis of
//! the direction and read the nearest texel (no filtering).

use std::path::{Path, PathBuf};

use lumen_math::Vec3;
use serde::Deserialize;
use thiserror::Error;

use crate::Color;

/// Errors that can occur while building a cubemap.
#[derive(Error, Debug)]
pub enum CubemapError {
    #[error("Failed to load {face:?} face '{}': {source}", .path.display())]
    Load {
        face: CubeFace,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{face:?} face is {width}x{height}x{channels}, expected {expected_width}x{expected_height}x{expected_channels}")]
    MismatchedFace {
        face: CubeFace,
        width: u32,
        height: u32,
        channels: usize,
        expected_width: u32,
        expected_height: u32,
        expected_channels: usize,
    },

    #[error("{face:?} face holds {actual} bytes, expected {expected}")]
    WrongDataLength {
        face: CubeFace,
        actual: usize,
        expected: usize,
    },

    #[error("Cubemap faces need 3 or 4 channels, got {0}")]
    UnsupportedChannels(usize),

    #[error("Cubemap faces cannot be empty")]
    Empty,
}

pub type CubemapResult<T> = Result<T, CubemapError>;

/// One face of the cube, named by the axis it faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeFace {
    /// +Z
    Front = 0,
    /// -Z
    Back = 1,
    /// -X
    Left = 2,
    /// +X
    Right = 3,
    /// +Y
    Top = 4,
    /// -Y
    Bottom = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::Front,
        CubeFace::Back,
        CubeFace::Left,
        CubeFace::Right,
        CubeFace::Top,
        CubeFace::Bottom,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pick the face a direction points at and project the direction onto
    /// it. The returned (u, v) are in [-1, 1].
    ///
    /// Ties between axes fall through to Y, then Z.
    pub fn project(dir: Vec3) -> (CubeFace, f32, f32) {
        let abs = dir.abs();

        if abs.x > abs.y && abs.x > abs.z {
            if dir.x > 0.0 {
                (CubeFace::Right, -dir.z / abs.x, -dir.y / abs.x)
            } else {
                (CubeFace::Left, dir.z / abs.x, -dir.y / abs.x)
            }
        } else if abs.y > abs.x && abs.y > abs.z {
            if dir.y > 0.0 {
                (CubeFace::Top, dir.x / abs.y, dir.z / abs.y)
            } else {
                (CubeFace::Bottom, dir.x / abs.y, -dir.z / abs.y)
            }
        } else if abs.z == 0.0 {
            // Zero direction
            (CubeFace::Front, 0.0, 0.0)
        } else if dir.z > 0.0 {
            (CubeFace::Front, dir.x / abs.z, -dir.y / abs.z)
        } else {
            (CubeFace::Back, -dir.x / abs.z, -dir.y / abs.z)
        }
    }
}

/// File locations of the six skybox faces.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SkyboxPaths {
    pub right: PathBuf,
    pub left: PathBuf,
    pub top: PathBuf,
    pub bottom: PathBuf,
    pub front: PathBuf,
    pub back: PathBuf,
}

impl SkyboxPaths {
    /// The conventional `right.jpg`, `left.jpg`, ... layout inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            right: dir.join("right.jpg"),
            left: dir.join("left.jpg"),
            top: dir.join("top.jpg"),
            bottom: dir.join("bottom.jpg"),
            front: dir.join("front.jpg"),
            back: dir.join("back.jpg"),
        }
    }

    /// Path for a given face.
    pub fn get(&self, face: CubeFace) -> &Path {
        match face {
            CubeFace::Front => &self.front,
            CubeFace::Back => &self.back,
            CubeFace::Left => &self.left,
            CubeFace::Right => &self.right,
            CubeFace::Top => &self.top,
            CubeFace::Bottom => &self.bottom,
        }
    }

    /// Resolve relative paths against `base`.
    pub fn resolved(&self, base: &Path) -> Self {
        let resolve = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                base.join(path)
            }
        };
        Self {
            right: resolve(&self.right),
            left: resolve(&self.left),
            top: resolve(&self.top),
            bottom: resolve(&self.bottom),
            front: resolve(&self.front),
            back: resolve(&self.back),
        }
    }
}

/// Six 8-bit face images sharing one size and channel count.
///
/// Immutable once built.
#[derive(Clone, Debug)]
pub struct Cubemap {
    faces: [Vec<u8>; 6],
    width: u32,
    height: u32,
    channels: usize,
}

impl Cubemap {
    /// Build a cubemap from raw, row-major face data indexed by [`CubeFace`].
    pub fn from_faces(
        width: u32,
        height: u32,
        channels: usize,
        faces: [Vec<u8>; 6],
    ) -> CubemapResult<Self> {
        if width == 0 || height == 0 {
            return Err(CubemapError::Empty);
        }
        if !(3..=4).contains(&channels) {
            return Err(CubemapError::UnsupportedChannels(channels));
        }

        let expected = width as usize * height as usize * channels;
        for face in CubeFace::ALL {
            let actual = faces[face.index()].len();
            if actual != expected {
                return Err(CubemapError::WrongDataLength {
                    face,
                    actual,
                    expected,
                });
            }
        }

        Ok(Self {
            faces,
            width,
            height,
            channels,
        })
    }

    /// A 1x1 cubemap of a single color, for scenes without skybox images.
    pub fn solid(color: Color) -> Self {
        let texel = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        let rgb = vec![
            texel.x.round() as u8,
            texel.y.round() as u8,
            texel.z.round() as u8,
        ];

        Self {
            faces: std::array::from_fn(|_| rgb.clone()),
            width: 1,
            height: 1,
            channels: 3,
        }
    }

    /// Decode the six face images.
    ///
    /// All faces must agree on size and channel count.
    pub fn load(paths: &SkyboxPaths) -> CubemapResult<Self> {
        let mut faces: [Vec<u8>; 6] = Default::default();
        let mut layout: Option<(u32, u32, usize)> = None;

        for face in CubeFace::ALL {
            let path = paths.get(face);
            let (width, height, channels, data) = load_face(face, path)?;

            match layout {
                None => layout = Some((width, height, channels)),
                Some((expected_width, expected_height, expected_channels)) => {
                    if (width, height, channels) != (expected_width, expected_height, expected_channels) {
                        return Err(CubemapError::MismatchedFace {
                            face,
                            width,
                            height,
                            channels,
                            expected_width,
                            expected_height,
                            expected_channels,
                        });
                    }
                }
            }

            log::debug!(
                "Loaded skybox face {:?}: {} ({}x{}, {} channels)",
                face,
                path.display(),
                width,
                height,
                channels
            );
            faces[face.index()] = data;
        }

        let (width, height, channels) = layout.ok_or(CubemapError::Empty)?;
        Self::from_faces(width, height, channels, faces)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Color seen looking along `direction` (need not be normalized).
    pub fn sample(&self, direction: Vec3) -> Color {
        let (face, u, v) = CubeFace::project(direction);

        let u = 0.5 * (u.clamp(-1.0, 1.0) + 1.0);
        let v = 0.5 * (v.clamp(-1.0, 1.0) + 1.0);

        // Truncate to the nearest-lower texel
        let x = (u * (self.width - 1) as f32) as usize;
        let y = (v * (self.height - 1) as f32) as usize;

        self.texel(face, x, y)
    }

    fn texel(&self, face: CubeFace, x: usize, y: usize) -> Color {
        let offset = (y * self.width as usize + x) * self.channels;
        let data = &self.faces[face.index()][offset..offset + 3];
        Color::new(data[0] as f32, data[1] as f32, data[2] as f32) / 255.0
    }
}

/// Decode one face, keeping alpha if the file has it.
fn load_face(face: CubeFace, path: &Path) -> CubemapResult<(u32, u32, usize, Vec<u8>)> {
    let img = image::open(path).map_err(|source| CubemapError::Load {
        face,
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = (img.width(), img.height());
    if img.color().has_alpha() {
        Ok((width, height, 4, img.into_rgba8().into_raw()))
    } else {
        Ok((width, height, 3, img.into_rgb8().into_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 RGB faces where every face is filled with a distinct gray level
    /// and texel (1, 1) of every face is pure red.
    fn tagged_cubemap() -> Cubemap {
        let faces = std::array::from_fn(|i| {
            let level = (i as u8 + 1) * 10;
            let mut data = vec![level; 2 * 2 * 3];
            data[9..12].copy_from_slice(&[255, 0, 0]);
            data
        });
        Cubemap::from_faces(2, 2, 3, faces).unwrap()
    }

    fn level_of(face: CubeFace) -> f32 {
        ((face.index() as u8 + 1) * 10) as f32 / 255.0
    }

    #[test]
    fn test_face_selection() {
        assert_eq!(CubeFace::project(Vec3::X).0, CubeFace::Right);
        assert_eq!(CubeFace::project(-Vec3::X).0, CubeFace::Left);
        assert_eq!(CubeFace::project(Vec3::Y).0, CubeFace::Top);
        assert_eq!(CubeFace::project(-Vec3::Y).0, CubeFace::Bottom);
        assert_eq!(CubeFace::project(Vec3::Z).0, CubeFace::Front);
        assert_eq!(CubeFace::project(-Vec3::Z).0, CubeFace::Back);
    }

    #[test]
    fn test_projection_signs() {
        // Right face: u follows -z, v follows -y
        let (_, u, v) = CubeFace::project(Vec3::new(2.0, -1.0, 1.0));
        assert!((u + 0.5).abs() < 1e-6);
        assert!((v - 0.5).abs() < 1e-6);

        // Top face: u follows x, v follows z
        let (_, u, v) = CubeFace::project(Vec3::new(0.5, 1.0, -0.25));
        assert!((u - 0.5).abs() < 1e-6);
        assert!((v + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_zero_direction_is_defined() {
        let (face, u, v) = CubeFace::project(Vec3::ZERO);
        assert_eq!(face, CubeFace::Front);
        assert_eq!((u, v), (0.0, 0.0));
    }

    #[test]
    fn test_sample_reads_face_texels() {
        let cubemap = tagged_cubemap();

        // Straight down the +Z axis lands on texel (0, 0) of the front face
        let center = cubemap.sample(Vec3::Z);
        assert!((center - Vec3::splat(level_of(CubeFace::Front))).length() < 1e-6);

        // The back face is a different image
        let back = cubemap.sample(-Vec3::Z);
        assert!((back - Vec3::splat(level_of(CubeFace::Back))).length() < 1e-6);

        // Corner direction (u = v = 1 after projection) reaches texel (1, 1)
        let corner = cubemap.sample(Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(corner, Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_solid_cubemap() {
        let sky = Cubemap::solid(Color::new(1.0, 0.0, 0.0));
        for dir in [Vec3::X, -Vec3::Y, Vec3::new(0.3, 0.2, -0.9)] {
            assert_eq!(sky.sample(dir), Color::new(1.0, 0.0, 0.0));
        }

        let black = Cubemap::solid(Color::ZERO);
        assert_eq!(black.sample(Vec3::Y), Color::ZERO);
    }

    #[test]
    fn test_rgba_faces_ignore_alpha() {
        let faces = std::array::from_fn(|_| vec![0, 255, 0, 7]);
        let cubemap = Cubemap::from_faces(1, 1, 4, faces).unwrap();
        assert_eq!(cubemap.sample(Vec3::X), Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_from_faces_validation() {
        let short = std::array::from_fn(|i| if i == 2 { vec![0; 3] } else { vec![0; 12] });
        assert!(matches!(
            Cubemap::from_faces(2, 2, 3, short),
            Err(CubemapError::WrongDataLength { face: CubeFace::Left, .. })
        ));

        let faces = std::array::from_fn(|_| vec![0; 2]);
        assert!(matches!(
            Cubemap::from_faces(1, 1, 2, faces),
            Err(CubemapError::UnsupportedChannels(2))
        ));

        let faces: [Vec<u8>; 6] = Default::default();
        assert!(matches!(Cubemap::from_faces(0, 0, 3, faces), Err(CubemapError::Empty)));
    }

    #[test]
    fn test_missing_face_file() {
        let paths = SkyboxPaths::in_dir("/definitely/not/a/skybox");
        let err = Cubemap::load(&paths).unwrap_err();
        assert!(matches!(err, CubemapError::Load { face: CubeFace::Front, .. }));
    }

    #[test]
    fn test_skybox_paths_resolve() {
        let paths = SkyboxPaths::in_dir("sky").resolved(Path::new("/scenes"));
        assert_eq!(paths.get(CubeFace::Top), Path::new("/scenes/sky/top.jpg"));

        let absolute = SkyboxPaths::in_dir("/abs/sky").resolved(Path::new("/scenes"));
        assert_eq!(absolute.get(CubeFace::Back), Path::new("/abs/sky/back.jpg"));
    }
}
