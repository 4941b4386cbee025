//! Well-known text parsing into PROJ definitions.
//!
//! Handles WKT1 (OGC and ESRI flavours) and WKT2. Supported methods:
//! geographic, Albers equal-area, Lambert conformal conic, transverse
//! mercator (incl. UTM), mercator and equirectangular. Anything else falls
//! back to an EPSG authority code when the WKT carries one.
//!
//! Linear units are not passed to PROJ: the definition is always in metres
//! and [`ProjDefinition::to_meter`] tells the caller how to scale input.

use crate::error::{ProjectionError, ProjectionResult};

/// A parsed WKT value.
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Node(WktNode),
    /// Quoted string
    Text(String),
    Number(f64),
    /// Bare enumeration word such as `east` or `Cartesian`
    Word(String),
}

/// `KEYWORD[arg, arg, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

impl WktNode {
    fn matches(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.keyword.eq_ignore_ascii_case(k))
    }

    /// First argument, when it is a quoted name.
    pub fn name(&self) -> Option<&str> {
        match self.args.first() {
            Some(WktValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Numeric argument at a position.
    pub fn number(&self, index: usize) -> Option<f64> {
        match self.args.get(index) {
            Some(WktValue::Number(v)) => Some(*v),
            Some(WktValue::Text(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn children<'a>(&'a self, keywords: &'a [&'a str]) -> impl Iterator<Item = &'a WktNode> + 'a {
        self.args.iter().filter_map(move |arg| match arg {
            WktValue::Node(node) if node.matches(keywords) => Some(node),
            _ => None,
        })
    }

    /// First direct child with one of the keywords.
    pub fn child(&self, keywords: &[&str]) -> Option<&WktNode> {
        self.args.iter().find_map(|arg| match arg {
            WktValue::Node(node) if node.matches(keywords) => Some(node),
            _ => None,
        })
    }

    /// Depth-first search for a descendant.
    pub fn find(&self, keywords: &[&str]) -> Option<&WktNode> {
        for arg in &self.args {
            if let WktValue::Node(node) = arg {
                if node.matches(keywords) {
                    return Some(node);
                }
                if let Some(found) = node.find(keywords) {
                    return Some(found);
                }
            }
        }
        None
    }
}

// =============================================================================
// Parser
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Comma,
    Quoted(String),
    Bare(String),
}

fn tokenize(input: &str) -> ProjectionResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '[' | '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ']' | ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        // A doubled quote is an escaped quote.
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            text.push('"');
                        }
                        Some('"') => break,
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(ProjectionError::InvalidWkt("unterminated string".to_string()))
                        }
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if matches!(ch, '[' | ']' | '(' | ')' | ',' | '"') || ch.is_whitespace() {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Bare(word));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn node(&mut self, keyword: String) -> ProjectionResult<WktNode> {
        match self.next() {
            Some(Token::Open) => {}
            _ => return Err(ProjectionError::InvalidWkt(format!("expected '[' after {}", keyword))),
        }

        let mut args = Vec::new();
        if self.peek() == Some(&Token::Close) {
            self.next();
            return Ok(WktNode { keyword, args });
        }

        loop {
            args.push(self.value()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => break,
                _ => {
                    return Err(ProjectionError::InvalidWkt(format!(
                        "unterminated {} node",
                        keyword
                    )))
                }
            }
        }
        Ok(WktNode { keyword, args })
    }

    fn value(&mut self) -> ProjectionResult<WktValue> {
        match self.next() {
            Some(Token::Quoted(text)) => Ok(WktValue::Text(text)),
            Some(Token::Bare(word)) => {
                if self.peek() == Some(&Token::Open) {
                    return Ok(WktValue::Node(self.node(word)?));
                }
                Ok(match word.parse::<f64>() {
                    Ok(v) => WktValue::Number(v),
                    Err(_) => WktValue::Word(word),
                })
            }
            other => Err(ProjectionError::InvalidWkt(format!("unexpected token {:?}", other))),
        }
    }
}

/// Parse WKT text into its node tree.
pub fn parse_wkt(input: &str) -> ProjectionResult<WktNode> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let root = match parser.next() {
        Some(Token::Bare(keyword)) => parser.node(keyword)?,
        _ => return Err(ProjectionError::InvalidWkt("expected a keyword".to_string())),
    };
    if parser.pos < parser.tokens.len() {
        return Err(ProjectionError::InvalidWkt("trailing content".to_string()));
    }
    Ok(root)
}

// =============================================================================
// Interpretation
// =============================================================================

const PROJECTED: &[&str] = &["PROJCS", "PROJCRS", "PROJECTEDCRS"];
const GEOGRAPHIC: &[&str] = &["GEOGCS", "GEOGCRS", "GEODCRS", "GEOGRAPHICCRS", "GEODETICCRS"];
const BASE_GEOGRAPHIC: &[&str] = &["GEOGCS", "BASEGEOGCRS", "BASEGEODCRS", "GEOGCRS", "GEODCRS"];
const LENGTH_UNIT: &[&str] = &["LENGTHUNIT", "UNIT"];
const ANGLE_UNIT: &[&str] = &["ANGLEUNIT", "UNIT"];
const ANY_UNIT: &[&str] = &["LENGTHUNIT", "ANGLEUNIT", "SCALEUNIT", "UNIT"];
const AUTHORITY: &[&str] = &["AUTHORITY", "ID"];

/// A PROJ string plus what the caller needs to feed it coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjDefinition {
    pub proj_string: String,
    /// Coordinates are longitude/latitude
    pub geographic: bool,
    /// Factor from the CRS's linear unit to metres
    pub to_meter: f64,
}

impl ProjDefinition {
    /// Wrap a PROJ string that already carries its own units.
    pub fn from_proj_string(proj_string: &str) -> Self {
        Self {
            proj_string: proj_string.to_string(),
            geographic: proj_string.contains("+proj=longlat") || proj_string.contains("+proj=latlong"),
            to_meter: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamKind {
    Angle,
    Length,
    Scale,
}

/// PROJ parameter and the WKT parameter names that map onto it.
const PARAMETERS: &[(&str, ParamKind, &[&str])] = &[
    (
        "lat_0",
        ParamKind::Angle,
        &[
            "latitude_of_origin",
            "latitude_of_false_origin",
            "latitude_of_natural_origin",
            "latitude_of_center",
            "latitude_of_centre",
            "latitude_of_projection_centre",
            "latitude_of_projection_center",
        ],
    ),
    (
        "lon_0",
        ParamKind::Angle,
        &[
            "central_meridian",
            "longitude_of_origin",
            "longitude_of_false_origin",
            "longitude_of_natural_origin",
            "longitude_of_center",
            "longitude_of_centre",
            "longitude_of_projection_centre",
            "longitude_of_projection_center",
        ],
    ),
    (
        "lat_1",
        ParamKind::Angle,
        &["standard_parallel_1", "latitude_of_1st_standard_parallel"],
    ),
    (
        "lat_2",
        ParamKind::Angle,
        &["standard_parallel_2", "latitude_of_2nd_standard_parallel"],
    ),
    (
        "k_0",
        ParamKind::Scale,
        &["scale_factor", "scale_factor_at_natural_origin"],
    ),
    (
        "x_0",
        ParamKind::Length,
        &["false_easting", "easting_at_false_origin", "easting_at_projection_centre"],
    ),
    (
        "y_0",
        ParamKind::Length,
        &["false_northing", "northing_at_false_origin", "northing_at_projection_centre"],
    ),
];

/// `"Latitude of 1st standard parallel"` → `"latitude_of_1st_standard_parallel"`.
fn normalize_name(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Projection method names, normalized, mapped to their proj4 `+proj` name.
/// Names are matched whole; oblique and pseudo variants are not aliases.
const METHOD_ALIASES: &[(&str, &str)] = &[
    ("albers", "aea"),
    ("albers_conic_equal_area", "aea"),
    ("albers_equal_area", "aea"),
    ("albers_equal_area_conic", "aea"),
    ("lambert_conformal_conic", "lcc"),
    ("lambert_conformal_conic_1sp", "lcc"),
    ("lambert_conformal_conic_2sp", "lcc"),
    ("lambert_conic_conformal_1sp", "lcc"),
    ("lambert_conic_conformal_2sp", "lcc"),
    ("transverse_mercator", "tmerc"),
    ("gauss_kruger", "tmerc"),
    ("mercator", "merc"),
    ("mercator_1sp", "merc"),
    ("mercator_2sp", "merc"),
    ("mercator_variant_a", "merc"),
    ("mercator_variant_b", "merc"),
    ("equirectangular", "eqc"),
    ("equidistant_cylindrical", "eqc"),
    ("plate_carree", "eqc"),
];

fn proj_method(method: &str) -> Option<&'static str> {
    let m = normalize_name(method);
    METHOD_ALIASES
        .iter()
        .find(|(name, _)| *name == m)
        .map(|(_, proj)| *proj)
}

const DEGREE: f64 = std::f64::consts::PI / 180.0;

/// Angle in degrees from a value in units of `factor` radians. Degree units
/// written with truncated precision are taken as exact degrees.
fn angle_to_degrees(value: f64, factor: f64) -> f64 {
    if (factor - DEGREE).abs() < 1e-12 {
        value
    } else {
        (value * factor).to_degrees()
    }
}

fn unit_factor(node: Option<&WktNode>) -> Option<f64> {
    node.and_then(|unit| unit.number(1)).filter(|f| *f > 0.0)
}

fn ellipsoid_terms(root: &WktNode) -> String {
    let Some(ellipsoid) = root.find(&["SPHEROID", "ELLIPSOID"]) else {
        return "+ellps=WGS84".to_string();
    };
    let (Some(a), Some(rf)) = (ellipsoid.number(1), ellipsoid.number(2)) else {
        return "+ellps=WGS84".to_string();
    };
    let a = a * unit_factor(ellipsoid.child(LENGTH_UNIT)).unwrap_or(1.0);
    let b = if rf == 0.0 { a } else { a * (1.0 - 1.0 / rf) };
    format!("+a={} +b={}", a, b)
}

fn authority_code(node: &WktNode) -> Option<u16> {
    let authority = node.child(AUTHORITY)?;
    if !authority.name()?.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    authority.number(1).and_then(|code| u16::try_from(code as i64).ok())
}

/// Resolve an EPSG code through the bundled CRS database.
pub fn epsg_definition(code: u16) -> ProjectionResult<ProjDefinition> {
    crs_definitions::from_code(code)
        .map(|def| ProjDefinition::from_proj_string(def.proj4))
        .ok_or_else(|| ProjectionError::UnsupportedCrs(format!("EPSG:{} is not in the CRS database", code)))
}

/// Build a PROJ definition from WKT.
pub fn wkt_to_proj(wkt: &str) -> ProjectionResult<ProjDefinition> {
    let root = parse_wkt(wkt)?;
    let ellipsoid = ellipsoid_terms(&root);

    if root.matches(GEOGRAPHIC) {
        return Ok(ProjDefinition {
            proj_string: format!("+proj=longlat {} +no_defs", ellipsoid),
            geographic: true,
            to_meter: 1.0,
        });
    }
    if !root.matches(PROJECTED) {
        return Err(ProjectionError::UnsupportedCrs(format!("unsupported WKT root {}", root.keyword)));
    }

    let conversion = root.child(&["CONVERSION"]).unwrap_or(&root);
    let method_name = conversion
        .child(&["METHOD", "PROJECTION"])
        .and_then(WktNode::name)
        .unwrap_or_default();
    let Some(method) = proj_method(method_name) else {
        return match authority_code(&root) {
            Some(code) => epsg_definition(code),
            None => Err(ProjectionError::UnsupportedCrs(format!(
                "projection method '{}'",
                method_name
            ))),
        };
    };

    // Linear unit of the coordinates: direct UNIT/LENGTHUNIT, else the first axis's.
    let to_meter = unit_factor(root.child(LENGTH_UNIT))
        .or_else(|| unit_factor(root.children(&["AXIS"]).find_map(|axis| axis.child(LENGTH_UNIT))))
        .unwrap_or(1.0);
    let angle_factor = unit_factor(root.find(BASE_GEOGRAPHIC).and_then(|g| g.child(ANGLE_UNIT)))
        .unwrap_or(DEGREE);

    let mut params: Vec<(&str, f64)> = Vec::new();
    for parameter in conversion.children(&["PARAMETER"]) {
        let (Some(name), Some(value)) = (parameter.name(), parameter.number(1)) else {
            continue;
        };
        let normalized = normalize_name(name);
        let Some((key, kind, _)) = PARAMETERS
            .iter()
            .find(|(_, _, aliases)| aliases.contains(&normalized.as_str()))
        else {
            continue;
        };
        let own_unit = unit_factor(parameter.child(ANY_UNIT));
        let converted = match kind {
            ParamKind::Angle => angle_to_degrees(value, own_unit.unwrap_or(angle_factor)),
            ParamKind::Length => value * own_unit.unwrap_or(to_meter),
            ParamKind::Scale => value,
        };
        params.push((*key, converted));
    }

    let get = |key: &str| params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
    let mut terms = vec![format!("+proj={}", method)];
    match method {
        "lcc" => {
            let lat_0 = get("lat_0").unwrap_or(0.0);
            let lat_1 = get("lat_1").unwrap_or(lat_0);
            terms.push(format!("+lat_0={} +lat_1={} +lat_2={}", lat_0, lat_1, get("lat_2").unwrap_or(lat_1)));
            if let Some(k) = get("k_0") {
                terms.push(format!("+k_0={}", k));
            }
        }
        "merc" | "eqc" => {
            if let Some(lat_ts) = get("lat_1") {
                terms.push(format!("+lat_ts={}", lat_ts));
            }
            if let Some(k) = get("k_0") {
                terms.push(format!("+k_0={}", k));
            }
        }
        _ => {
            for key in ["lat_0", "lat_1", "lat_2", "k_0"] {
                if let Some(v) = get(key) {
                    terms.push(format!("+{}={}", key, v));
                }
            }
        }
    }
    for key in ["lon_0", "x_0", "y_0"] {
        terms.push(format!("+{}={}", key, get(key).unwrap_or(0.0)));
    }
    terms.push(ellipsoid);
    terms.push("+units=m +no_defs".to_string());

    Ok(ProjDefinition {
        proj_string: terms.join(" "),
        geographic: false,
        to_meter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_wkt::ESRI_ALBERS_FT;

    const WKT2_LCC: &str = r#"PROJCRS["NAD83 / West Virginia North (ftUS)",
        BASEGEOGCRS["NAD83",
            DATUM["North American Datum 1983",
                ELLIPSOID["GRS 1980",6378137,298.257222101,LENGTHUNIT["metre",1]]],
            PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]]],
        CONVERSION["SPCS83 West Virginia North zone (US Survey feet)",
            METHOD["Lambert Conic Conformal (2SP)",ID["EPSG",9802]],
            PARAMETER["Latitude of false origin",38.5,ANGLEUNIT["degree",0.0174532925199433]],
            PARAMETER["Longitude of false origin",-79.5,ANGLEUNIT["degree",0.0174532925199433]],
            PARAMETER["Latitude of 1st standard parallel",40.25,ANGLEUNIT["degree",0.0174532925199433]],
            PARAMETER["Latitude of 2nd standard parallel",39,ANGLEUNIT["degree",0.0174532925199433]],
            PARAMETER["Easting at false origin",1968500,LENGTHUNIT["US survey foot",0.304800609601219]],
            PARAMETER["Northing at false origin",0,LENGTHUNIT["US survey foot",0.304800609601219]]],
        CS[Cartesian,2],
            AXIS["easting (X)",east,ORDER[1],LENGTHUNIT["US survey foot",0.304800609601219]],
            AXIS["northing (Y)",north,ORDER[2],LENGTHUNIT["US survey foot",0.304800609601219]],
        ID["EPSG",26853]]"#;

    #[test]
    fn test_parse_tree() {
        let root = parse_wkt(r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]]"#)
            .unwrap();
        assert_eq!(root.keyword, "GEOGCS");
        assert_eq!(root.name(), Some("WGS 84"));
        let spheroid = root.find(&["SPHEROID"]).unwrap();
        assert_eq!(spheroid.number(1), Some(6378137.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_wkt("").is_err());
        assert!(parse_wkt("GEOGCS[\"x\"").is_err());
        assert!(parse_wkt("GEOGCS[\"x\"]]").is_err());
        assert!(parse_wkt("GEOGCS[\"unterminated]").is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Latitude of 1st standard parallel"), "latitude_of_1st_standard_parallel");
        assert_eq!(normalize_name("False_Easting"), "false_easting");
    }

    #[test]
    fn test_geographic() {
        let def = wkt_to_proj(r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],UNIT["degree",0.0174532925199433]]"#)
            .unwrap();
        assert!(def.geographic);
        assert!(def.proj_string.starts_with("+proj=longlat"));
    }

    #[test]
    fn test_esri_albers_feet() {
        let def = wkt_to_proj(ESRI_ALBERS_FT).unwrap();
        assert!(!def.geographic);
        assert!((def.to_meter - 0.3048006096012192).abs() < 1e-15);
        assert!(def.proj_string.contains("+proj=aea"));
        assert!(def.proj_string.contains("+lat_0=23"));
        assert!(def.proj_string.contains("+lat_1=29.5"));
        assert!(def.proj_string.contains("+lat_2=45.5"));
        assert!(def.proj_string.contains("+lon_0=-96"));
        assert!(def.proj_string.contains("+units=m"));
    }

    #[test]
    fn test_wkt2_lcc_parameter_units() {
        let def = wkt_to_proj(WKT2_LCC).unwrap();
        assert!(def.proj_string.contains("+proj=lcc"));
        assert!(def.proj_string.contains("+lat_1=40.25"));
        assert!(def.proj_string.contains("+lat_2=39"));
        // False easting converted from US survey feet to metres.
        let x_0: f64 = def
            .proj_string
            .split_whitespace()
            .find_map(|t| t.strip_prefix("+x_0="))
            .unwrap()
            .parse()
            .unwrap();
        assert!((x_0 - 600_000.0).abs() < 0.01);
        assert!((def.to_meter - 0.304800609601219).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_method_without_authority() {
        let wkt = r#"PROJCS["x",GEOGCS["g",DATUM["d",SPHEROID["s",6378137,298.257]]],PROJECTION["Hotine_Oblique_Mercator"],UNIT["metre",1]]"#;
        assert!(matches!(wkt_to_proj(wkt), Err(ProjectionError::UnsupportedCrs(_))));
    }

    #[test]
    fn test_method_names_match_whole() {
        assert_eq!(proj_method("Transverse_Mercator"), Some("tmerc"));
        assert_eq!(proj_method("Mercator (variant A)"), Some("merc"));
        assert_eq!(proj_method("Lambert Conic Conformal (2SP)"), Some("lcc"));
        assert_eq!(proj_method("Albers"), Some("aea"));
        assert_eq!(proj_method("Hotine_Oblique_Mercator"), None);
        assert_eq!(proj_method("Oblique_Mercator"), None);
        assert_eq!(proj_method("Transverse_Mercator_South_Orientated"), None);
    }

    #[test]
    fn test_child_lookup() {
        let node = parse_wkt(r#"UNIT["metre",1,AUTHORITY["EPSG","9001"]]"#).unwrap();
        let authority = node.child(&["AUTHORITY", "ID"]).unwrap();
        assert_eq!(authority.name(), Some("EPSG"));
        assert_eq!(authority.number(1), Some(9001.0));
        assert!(node.child(&["SPHEROID"]).is_none());
    }

    #[test]
    fn test_unsupported_method_falls_back_to_authority() {
        let wkt = r#"PROJCS["NAD83 / UTM zone 17N",GEOGCS["NAD83",DATUM["d",SPHEROID["GRS 1980",6378137,298.257222101]]],PROJECTION["Some_Unknown_Method"],UNIT["metre",1],AUTHORITY["EPSG","26917"]]"#;
        let def = wkt_to_proj(wkt).unwrap();
        assert!(def.proj_string.contains("+proj=utm"));
    }
}
