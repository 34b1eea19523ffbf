use super::{constants::*, error::CatalogError, registry::Catalog, types::*};
use bevy::log::{debug, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Contents of a Tiled `.tsx` tileset, before catalog validation
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetDescriptor {
    pub name: String,
    pub version: Option<(u32, u32)>,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles: Vec<TileDefinition>,
}

/// Read a `.tsx` descriptor from disk and build the catalog.
///
/// Image paths are kept exactly as written; whether the files exist is the
/// asset pipeline's concern.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogError> {
    let xml = read_descriptor(path)?;
    Catalog::from_tsx_str(&xml)
}

/// Read the raw descriptor text without parsing it
pub fn read_descriptor<P: AsRef<Path>>(path: P) -> Result<String, CatalogError> {
    let path = path.as_ref();
    info!("Reading tileset descriptor {}", path.display());
    Ok(fs::read_to_string(path)?)
}

impl Catalog {
    /// Parse and validate a `.tsx` document
    pub fn from_tsx_str(xml: &str) -> Result<Self, CatalogError> {
        let descriptor = parse_tileset(xml)?;
        Catalog::from_definitions(descriptor.tile_width, descriptor.tile_height, descriptor.tiles)
    }
}

/// Tileset-level attributes
#[derive(Debug)]
struct Header {
    name: String,
    version: Option<(u32, u32)>,
    tile_width: u32,
    tile_height: u32,
    tile_count: Option<usize>,
}

#[derive(Debug)]
struct ImageRecord {
    source: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug)]
enum ObjectKind {
    /// Plain object; width/height decide between point, edge and rectangle
    Plain,
    Point,
    Polyline(String),
    Unsupported(String),
}

#[derive(Debug)]
struct ObjectRecord {
    x: f32,
    y: f32,
    width: Option<f32>,
    height: Option<f32>,
    kind: ObjectKind,
}

#[derive(Debug)]
struct TileRecord {
    id: TileId,
    image: Option<ImageRecord>,
    properties: Vec<(String, String)>,
    objects: Vec<ObjectRecord>,
}

/// Parse a `.tsx` document into tile definitions.
///
/// Roles and terrain names are inferred here; geometry bounds, duplicate ids
/// and fill coverage are checked by [`Catalog::from_definitions`].
pub fn parse_tileset(xml: &str) -> Result<TilesetDescriptor, CatalogError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut header: Option<Header> = None;
    let mut tiles: Vec<TileDefinition> = Vec::new();
    let mut current_tile: Option<TileRecord> = None;
    let mut current_object: Option<ObjectRecord> = None;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let self_closing = matches!(event, Event::Empty(_));
                let attrs = read_attributes(e)?;
                let tile_id = current_tile.as_ref().map(|tile| tile.id);

                match e.name().as_ref() {
                    b"tileset" => {
                        if header.is_some() {
                            return Err(CatalogError::malformed("nested <tileset> element"));
                        }
                        header = Some(parse_header(&attrs)?);
                    }
                    b"grid" => {
                        let orientation =
                            attr(&attrs, "orientation").unwrap_or(GRID_ORIENTATION_ORTHOGONAL);
                        if orientation != GRID_ORIENTATION_ORTHOGONAL {
                            return Err(CatalogError::malformed(format!(
                                "unsupported grid orientation '{}'",
                                orientation
                            )));
                        }
                    }
                    b"tile" => {
                        if header.is_none() {
                            return Err(CatalogError::malformed("<tile> outside <tileset>"));
                        }
                        if current_tile.is_some() {
                            return Err(CatalogError::malformed("nested <tile> element"));
                        }
                        let id = parse_attr::<TileId>(&attrs, "id", None)?
                            .ok_or_else(|| CatalogError::malformed("tile without id"))?;
                        let record = TileRecord {
                            id,
                            image: None,
                            properties: Vec::new(),
                            objects: Vec::new(),
                        };
                        if self_closing {
                            tiles.push(finish_tile(record, header.as_ref())?);
                        } else {
                            current_tile = Some(record);
                        }
                    }
                    b"image" => match current_tile.as_mut() {
                        Some(tile) => {
                            if tile.image.is_some() {
                                return Err(CatalogError::malformed_tile(
                                    tile.id,
                                    "tile has more than one image",
                                ));
                            }
                            tile.image = Some(ImageRecord {
                                source: attr(&attrs, "source").unwrap_or_default().to_owned(),
                                width: parse_attr(&attrs, "width", tile_id)?,
                                height: parse_attr(&attrs, "height", tile_id)?,
                            });
                        }
                        None => {
                            return Err(CatalogError::malformed(
                                "atlas tilesets (tileset-level <image>) are not supported",
                            ));
                        }
                    },
                    b"property" => {
                        // Object properties never affect the tile itself
                        if current_object.is_none() {
                            if let Some(tile) = current_tile.as_mut() {
                                let name = attr(&attrs, "name").unwrap_or_default().to_owned();
                                let value = attr(&attrs, "value").unwrap_or_default().to_owned();
                                tile.properties.push((name, value));
                            }
                        }
                    }
                    b"object" => {
                        if let Some(tile) = current_tile.as_mut() {
                            if current_object.is_some() {
                                return Err(CatalogError::malformed_tile(
                                    tile.id,
                                    "nested <object> element",
                                ));
                            }
                            // Shapes are axis-aligned, a rotated object can't be represented
                            let rotation = parse_attr::<f32>(&attrs, "rotation", tile_id)?;
                            if let Some(degrees) = rotation.filter(|&degrees| degrees != 0.0) {
                                return Err(CatalogError::malformed_tile(
                                    tile.id,
                                    format!("rotated object ({} degrees) unsupported", degrees),
                                ));
                            }
                            let object = ObjectRecord {
                                x: parse_attr(&attrs, "x", tile_id)?.unwrap_or(0.0),
                                y: parse_attr(&attrs, "y", tile_id)?.unwrap_or(0.0),
                                width: parse_attr(&attrs, "width", tile_id)?,
                                height: parse_attr(&attrs, "height", tile_id)?,
                                kind: ObjectKind::Plain,
                            };
                            if self_closing {
                                tile.objects.push(object);
                            } else {
                                current_object = Some(object);
                            }
                        }
                    }
                    tag @ (b"point" | b"polyline" | b"polygon" | b"ellipse" | b"text") => {
                        if let Some(object) = current_object.as_mut() {
                            object.kind = match tag {
                                b"point" => ObjectKind::Point,
                                b"polyline" => ObjectKind::Polyline(
                                    attr(&attrs, "points").unwrap_or_default().to_owned(),
                                ),
                                _ => ObjectKind::Unsupported(
                                    String::from_utf8_lossy(tag).into_owned(),
                                ),
                            };
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"object" => {
                    if let (Some(object), Some(tile)) =
                        (current_object.take(), current_tile.as_mut())
                    {
                        tile.objects.push(object);
                    }
                }
                b"tile" => {
                    if let Some(record) = current_tile.take() {
                        tiles.push(finish_tile(record, header.as_ref())?);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let header = header.ok_or_else(|| CatalogError::malformed("missing <tileset> element"))?;
    if current_tile.is_some() {
        return Err(CatalogError::malformed("unterminated <tile> element"));
    }
    if let Some(expected) = header.tile_count {
        if expected != tiles.len() {
            return Err(CatalogError::malformed(format!(
                "tilecount says {} tiles but {} are declared",
                expected,
                tiles.len()
            )));
        }
    }

    debug!("Parsed tileset '{}' with {} tiles", header.name, tiles.len());
    Ok(TilesetDescriptor {
        name: header.name,
        version: header.version,
        tile_width: header.tile_width,
        tile_height: header.tile_height,
        tiles,
    })
}

fn parse_header(attrs: &[(String, String)]) -> Result<Header, CatalogError> {
    let version = match attr(attrs, "version") {
        Some(text) => {
            let version = parse_version(text).ok_or_else(|| {
                CatalogError::malformed(format!("unreadable tileset version '{}'", text))
            })?;
            if version < MIN_TILESET_VERSION || version > MAX_TILESET_VERSION {
                return Err(CatalogError::malformed(format!(
                    "tileset version {} outside supported range {}.{}..={}.{}",
                    text,
                    MIN_TILESET_VERSION.0,
                    MIN_TILESET_VERSION.1,
                    MAX_TILESET_VERSION.0,
                    MAX_TILESET_VERSION.1
                )));
            }
            Some(version)
        }
        None => None,
    };

    let tile_width = parse_attr::<u32>(attrs, "tilewidth", None)?
        .ok_or_else(|| CatalogError::malformed("tileset without tilewidth"))?;
    let tile_height = parse_attr::<u32>(attrs, "tileheight", None)?
        .ok_or_else(|| CatalogError::malformed("tileset without tileheight"))?;

    Ok(Header {
        name: attr(attrs, "name").unwrap_or_default().to_owned(),
        version,
        tile_width,
        tile_height,
        tile_count: parse_attr(attrs, "tilecount", None)?,
    })
}

/// "1.10" -> (1, 10). Compared numerically, so 1.10 is newer than 1.9.
fn parse_version(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

fn finish_tile(
    record: TileRecord,
    header: Option<&Header>,
) -> Result<TileDefinition, CatalogError> {
    let header = header.ok_or_else(|| CatalogError::malformed("<tile> outside <tileset>"))?;
    let id = record.id;
    let image = record
        .image
        .ok_or_else(|| CatalogError::malformed_tile(id, "tile has no image"))?;
    let stem = Path::new(&image.source)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    let role = match property(&record.properties, PROPERTY_ORIENTATION) {
        Some(tag) => Some(role_from_tag(id, tag)?),
        None => match stem.strip_prefix(ORIENTATION_STEM_PREFIX) {
            Some(tag) => Some(role_from_tag(id, tag)?),
            None => None,
        },
    };

    // Plain tiles name their terrain after the image ("grass.png" fills "grass")
    let terrain = match property(&record.properties, PROPERTY_TERRAIN) {
        Some(name) => Some(name.to_owned()),
        None if role.is_none() && !stem.is_empty() => Some(stem.to_owned()),
        None => None,
    };

    let collision = record
        .objects
        .iter()
        .map(|object| object_to_shape(id, object))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TileDefinition {
        id,
        image: image.source,
        width: image.width.unwrap_or(header.tile_width),
        height: image.height.unwrap_or(header.tile_height),
        terrain,
        role,
        collision,
    })
}

fn role_from_tag(id: TileId, tag: &str) -> Result<OrientationRole, CatalogError> {
    OrientationRole::from_tag(tag).ok_or_else(|| {
        CatalogError::malformed_tile(id, format!("unknown orientation tag '{}'", tag))
    })
}

fn object_to_shape(id: TileId, object: &ObjectRecord) -> Result<CollisionShape, CatalogError> {
    let (x, y) = (object.x, object.y);
    match &object.kind {
        ObjectKind::Point => Ok(CollisionShape::point(x, y)),
        ObjectKind::Polyline(points) => polyline_edge(x, y, points).ok_or_else(|| {
            CatalogError::malformed_tile(
                id,
                format!("polyline '{}' is not a single vertical edge", points),
            )
        }),
        ObjectKind::Unsupported(tag) => Err(CatalogError::malformed_tile(
            id,
            format!("unsupported shape tag '{}'", tag),
        )),
        ObjectKind::Plain => {
            let width = object.width.unwrap_or(0.0);
            let height = object.height.unwrap_or(0.0);
            if width == 0.0 && height == 0.0 {
                Ok(CollisionShape::point(x, y))
            } else if width == 0.0 {
                Ok(CollisionShape::open_edge(x, y, height))
            } else if height == 0.0 {
                Err(CatalogError::malformed_tile(
                    id,
                    format!("object with width {} but no height", width),
                ))
            } else {
                Ok(CollisionShape::rectangle(x, y, width, height))
            }
        }
    }
}

/// A two-point vertical polyline is the same thing as an open edge
fn polyline_edge(x: f32, y: f32, points: &str) -> Option<CollisionShape> {
    let points = points
        .split_whitespace()
        .map(|pair| {
            let (px, py) = pair.split_once(',')?;
            Some((px.parse::<f32>().ok()?, py.parse::<f32>().ok()?))
        })
        .collect::<Option<Vec<_>>>()?;

    match points.as_slice() {
        [(x0, y0), (x1, y1)] if x0 == x1 && y0 != y1 => Some(CollisionShape::open_edge(
            x + x0,
            y + y0.min(*y1),
            (y1 - y0).abs(),
        )),
        _ => None,
    }
}

fn read_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, CatalogError> {
    let mut attrs = Vec::new();
    for attribute in e.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| CatalogError::Xml(err.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn parse_attr<T: FromStr>(
    attrs: &[(String, String)],
    key: &str,
    tile: Option<TileId>,
) -> Result<Option<T>, CatalogError> {
    match attr(attrs, key) {
        Some(text) => text.trim().parse().map(Some).map_err(|_| CatalogError::Malformed {
            tile,
            reason: format!("invalid {} '{}'", key, text),
        }),
        None => Ok(None),
    }
}

fn property<'a>(properties: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attr(properties, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED_TILESET: &str = include_str!("../../assets/tilesets/tileset.tsx");

    fn tileset(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" tiledversion="1.11.2" name="test"
 tilewidth="64" tileheight="64" columns="0">
 <grid orientation="orthogonal" width="1" height="1"/>
{}
</tileset>"#,
            body
        )
    }

    #[test]
    fn test_parse_shipped_tileset() {
        let descriptor = parse_tileset(SHIPPED_TILESET).unwrap();

        assert_eq!(descriptor.name, "tileSet");
        assert_eq!(descriptor.version, Some((1, 10)));
        assert_eq!((descriptor.tile_width, descriptor.tile_height), (64, 64));
        assert_eq!(descriptor.tiles.len(), 17);

        let border = descriptor.tiles.iter().find(|tile| tile.id == 3).unwrap();
        assert_eq!(border.image, "../image/tiles/border.png");
        assert_eq!(border.terrain.as_deref(), Some("border"));
        assert_eq!(border.role, None);
        assert_eq!(
            border.collision,
            vec![
                CollisionShape::open_edge(0.0, 0.0, 64.0),
                CollisionShape::open_edge(0.0, 0.0, 64.0),
                CollisionShape::rectangle(0.0, 0.0, 64.0, 64.0),
                CollisionShape::point(0.0, 0.0),
            ]
        );

        let top = descriptor.tiles.iter().find(|tile| tile.id == 15).unwrap();
        assert_eq!(top.role, Some(OrientationRole::Top));
        assert_eq!(top.terrain, None);

        let corner = descriptor.tiles.iter().find(|tile| tile.id == 22).unwrap();
        assert_eq!(corner.role, Some(OrientationRole::CornerBottomLeft));
    }

    #[test]
    fn test_shipped_tileset_builds_catalog() {
        let catalog = Catalog::from_tsx_str(SHIPPED_TILESET).unwrap();

        assert_eq!(catalog.len(), 17);
        assert_eq!(catalog.terrain_count(), 9);
        assert_eq!(catalog.tile_size(), (64, 64));

        let water = catalog.terrain_id("water").unwrap();
        assert_eq!(catalog.fill_tile(water), Some(14));
        assert_eq!(catalog.find_by_role(water, OrientationRole::Bottom), &[23]);
        assert_eq!(catalog.find_by_role(water, OrientationRole::CornerTopRight), &[19]);
        assert!(catalog.find_by_role(water, OrientationRole::Isolated).is_empty());
    }

    #[test]
    fn test_round_trip_against_input_records() {
        let descriptor = parse_tileset(SHIPPED_TILESET).unwrap();
        let catalog = Catalog::from_tsx_str(SHIPPED_TILESET).unwrap();

        for tile in &descriptor.tiles {
            assert_eq!(catalog.lookup(tile.id).unwrap(), tile);
        }
    }

    #[test]
    fn test_properties_override_inference() {
        let xml = tileset(
            r#"<tile id="1">
  <properties>
   <property name="terrain" value="meadow"/>
  </properties>
  <image source="grass.png" width="64" height="64"/>
 </tile>
 <tile id="2">
  <properties>
   <property name="terrain" value="meadow"/>
   <property name="Orientation" value="corner-top-left"/>
  </properties>
  <image source="meadow_ctl.png" width="64" height="64"/>
 </tile>"#,
        );
        let descriptor = parse_tileset(&xml).unwrap();

        assert_eq!(descriptor.tiles[0].terrain.as_deref(), Some("meadow"));
        assert_eq!(descriptor.tiles[1].terrain.as_deref(), Some("meadow"));
        assert_eq!(descriptor.tiles[1].role, Some(OrientationRole::CornerTopLeft));
    }

    #[test]
    fn test_unknown_orientation_rejected() {
        let xml = tileset(
            r#"<tile id="15"><image source="Orientation=up.png" width="64" height="64"/></tile>"#,
        );
        let err = parse_tileset(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { tile: Some(15), .. }));
    }

    #[test]
    fn test_negative_width_rectangle_rejected() {
        let xml = tileset(
            r#"<tile id="3">
  <image source="border.png" width="64" height="64"/>
  <objectgroup draworder="index" id="2">
   <object id="1" x="64" y="0" width="-64" height="64"/>
  </objectgroup>
 </tile>"#,
        );
        let err = Catalog::from_tsx_str(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { tile: Some(3), .. }));
    }

    #[test]
    fn test_unknown_shape_tag_rejected() {
        let xml = tileset(
            r#"<tile id="3">
  <image source="border.png" width="64" height="64"/>
  <objectgroup draworder="index" id="2">
   <object id="1" x="0" y="0" width="32" height="32"><ellipse/></object>
  </objectgroup>
 </tile>"#,
        );
        let err = parse_tileset(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { tile: Some(3), .. }));
    }

    #[test]
    fn test_point_and_polyline_shapes() {
        let xml = tileset(
            r#"<tile id="3">
  <image source="border.png" width="64" height="64"/>
  <objectgroup draworder="index" id="2">
   <object id="1" x="10" y="20"><point/></object>
   <object id="2" x="64" y="0"><polyline points="0,64 0,0"/></object>
  </objectgroup>
 </tile>"#,
        );
        let descriptor = parse_tileset(&xml).unwrap();

        assert_eq!(
            descriptor.tiles[0].collision,
            vec![
                CollisionShape::point(10.0, 20.0),
                CollisionShape::open_edge(64.0, 0.0, 64.0),
            ]
        );
    }

    #[test]
    fn test_rotated_object_rejected() {
        let xml = tileset(
            r#"<tile id="3">
  <image source="border.png" width="64" height="64"/>
  <objectgroup>
   <object id="1" x="0" y="0" width="32" height="32" rotation="45"/>
  </objectgroup>
 </tile>"#,
        );
        let err = parse_tileset(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { tile: Some(3), .. }));

        // An explicit zero rotation is still axis-aligned
        let xml = xml.replace(r#"rotation="45""#, r#"rotation="0""#);
        assert_eq!(
            parse_tileset(&xml).unwrap().tiles[0].collision,
            vec![CollisionShape::rectangle(0.0, 0.0, 32.0, 32.0)]
        );
    }

    #[test]
    fn test_diagonal_polyline_rejected() {
        let xml = tileset(
            r#"<tile id="3">
  <image source="border.png" width="64" height="64"/>
  <objectgroup><object id="1" x="0" y="0"><polyline points="0,0 64,64"/></object></objectgroup>
 </tile>"#,
        );
        assert!(parse_tileset(&xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_version_range() {
        let newer = SHIPPED_TILESET.replace(r#"version="1.10""#, r#"version="2.0""#);
        assert!(parse_tileset(&newer).unwrap_err().is_malformed());

        let older = SHIPPED_TILESET.replace(r#"version="1.10""#, r#"version="1.2""#);
        assert_eq!(parse_tileset(&older).unwrap().version, Some((1, 2)));
    }

    #[test]
    fn test_isometric_rejected() {
        let xml = SHIPPED_TILESET
            .replace(r#"orientation="orthogonal""#, r#"orientation="isometric""#);
        assert!(parse_tileset(&xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_tile_without_image_rejected() {
        let xml = tileset(r#"<tile id="7"/>"#);
        let err = parse_tileset(&xml).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { tile: Some(7), .. }));
    }

    #[test]
    fn test_tile_count_mismatch_rejected() {
        let xml = SHIPPED_TILESET.replace(r#"tilecount="17""#, r#"tilecount="18""#);
        assert!(parse_tileset(&xml).unwrap_err().is_malformed());
    }

    #[test]
    fn test_broken_xml() {
        let xml = r#"<tileset tilewidth="64" tileheight="64"><tile id="1"></tileset>"#;
        let err = parse_tileset(xml).unwrap_err();
        assert!(matches!(err, CatalogError::Xml(_) | CatalogError::Malformed { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("missing_tileset_for_test.tsx");
        assert!(matches!(load_catalog(&path), Err(CatalogError::Io(_))));
    }
}
