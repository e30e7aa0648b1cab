use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use lascat_core::points::{PointSet, HEIGHT_ABOVE_GROUND};

use super::{parse_format, Column};

/// Writes point sets as delimited text, one point per line. Floating point columns are written with a fixed
/// precision, where trailing zeros are removed
pub struct AsciiWriter<W: Write> {
    writer: W,
    columns: Vec<Column>,
    delimiter: String,
    precision: usize,
}

impl<W: Write> AsciiWriter<W> {
    pub fn from_write(write: W, format: &str) -> Result<Self> {
        Ok(Self {
            writer: write,
            columns: parse_format(format)?,
            delimiter: String::from(", "),
            precision: 5,
        })
    }

    pub fn set_delimiter(&mut self, delimiter: &str) {
        self.delimiter = String::from(delimiter);
    }

    /// Sets the number of decimal places of floating point columns
    pub fn set_precision(&mut self, precision: usize) {
        self.precision = precision;
    }

    /// Writes all points of `points`. Fails if the format contains a height above ground column but the point set
    /// has no such field
    pub fn write(&mut self, points: &PointSet) -> Result<()> {
        let heights = points.field(HEIGHT_ABOVE_GROUND);
        if heights.is_none() && self.columns.contains(&Column::HeightAboveGround) {
            bail!("Points have no {} field to write", HEIGHT_ABOVE_GROUND);
        }
        let mut line = String::new();
        for (index, point) in points.iter().enumerate() {
            line.clear();
            for (column_index, column) in self.columns.iter().enumerate() {
                if column_index > 0 {
                    line.push_str(&self.delimiter);
                }
                let value = match column {
                    Column::Skip => String::from("0"),
                    Column::X => self.format_float(point.x()),
                    Column::Y => self.format_float(point.y()),
                    Column::Z => self.format_float(point.z()),
                    Column::Intensity => point.intensity.to_string(),
                    Column::ReturnNumber => point.return_number.to_string(),
                    Column::NumberOfReturns => point.number_of_returns.to_string(),
                    Column::Classification => point.classification.to_string(),
                    Column::HeightAboveGround => {
                        self.format_float(heights.map(|h| h[index]).unwrap_or(f64::NAN))
                    }
                };
                line.push_str(&value);
            }
            line.push('\n');
            self.writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn format_float(&self, value: f64) -> String {
        let formatted = format!("{:.*}", self.precision, value);
        trim_unnecessary_trailing_zeros(&formatted).to_string()
    }
}

impl AsciiWriter<BufWriter<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P, format: &str) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
        Self::from_write(BufWriter::new(file), format)
    }
}

fn trim_unnecessary_trailing_zeros(value: &str) -> &str {
    if !value.contains('.') {
        return value;
    }
    let mut end = value.len();
    while value[..end].ends_with('0') && !value[..end].ends_with(".0") {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lascat_core::points::PointRecord;

    #[test]
    fn test_trim_trailing_zeros() {
        assert_eq!(trim_unnecessary_trailing_zeros("1.50000"), "1.5");
        assert_eq!(trim_unnecessary_trailing_zeros("2.00000"), "2.0");
        assert_eq!(trim_unnecessary_trailing_zeros("100"), "100");
    }

    #[test]
    fn test_write_points() -> Result<()> {
        let points = PointSet::from_points(vec![
            PointRecord::at(1.25, 2.0, 3.123456).with_classification(2),
            PointRecord::at(4.0, 5.0, 6.0).with_returns(2, 3),
        ])
        .with_field(HEIGHT_ABOVE_GROUND, vec![0.0, 2.5])?;
        let mut writer = AsciiWriter::from_write(vec![], "xyzrnch")?;
        writer.write(&points)?;
        let text = String::from_utf8(writer.writer)?;
        assert_eq!(
            text,
            "1.25, 2.0, 3.12346, 1, 1, 2, 0.0\n4.0, 5.0, 6.0, 2, 3, 0, 2.5\n"
        );
        Ok(())
    }

    #[test]
    fn test_missing_height_field() {
        let points = PointSet::from_points(vec![PointRecord::at(1.0, 2.0, 3.0)]);
        let mut writer = AsciiWriter::from_write(vec![], "xyzh").unwrap();
        assert!(writer.write(&points).is_err());
    }
}
