use anyhow::{bail, Result};

/// The meaning of one column of a delimited point file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// A column that is not read, or written as `0`
    Skip,
    X,
    Y,
    Z,
    Intensity,
    ReturnNumber,
    NumberOfReturns,
    Classification,
    /// The height above ground field of a point set. Only written, reading treats it as [Column::Skip]
    HeightAboveGround,
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Description of the literals that [parse_format] understands
pub const FORMAT_LITERALS: &str = "s - skip this column
x - x coordinate
y - y coordinate
z - z coordinate
i - intensity
r - return number
n - number of returns of the pulse
c - classification
h - height above ground (written only)
t, u, p, R, G, B, I, e, d, a - LAStools attributes without a lascat counterpart, skipped";

/// Parses a format string such as `xyzirnc` into its columns. Literals of LAStools attributes that points in
/// lascat do not carry (GPS time, colors, ...) are accepted and skipped. The format has to contain x, y and z
pub fn parse_format(format: &str) -> Result<Vec<Column>> {
    let columns = format
        .chars()
        .map(|literal| {
            Ok(match literal {
                's' | 't' | 'u' | 'p' | 'R' | 'G' | 'B' | 'I' | 'e' | 'd' | 'a' => Column::Skip,
                'x' => Column::X,
                'y' => Column::Y,
                'z' => Column::Z,
                'i' => Column::Intensity,
                'r' => Column::ReturnNumber,
                'n' => Column::NumberOfReturns,
                'c' => Column::Classification,
                'h' => Column::HeightAboveGround,
                _ => bail!(
                    "Can't interpret format literal '{}' in format string '{}'",
                    literal,
                    format
                ),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    for required in &[Column::X, Column::Y, Column::Z] {
        if !columns.contains(required) {
            bail!("Format string '{}' has no column for {}", format, required);
        }
    }
    Ok(columns)
}
