use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use itertools::{EitherOrBoth::*, Itertools};
use lascat_core::points::PointRecord;

use super::{parse_format, Column};

/// Reads points from delimited text, one point per line. Empty lines and lines starting with `#` are skipped,
/// surplus columns at the end of a line are ignored
pub struct AsciiReader<R: BufRead> {
    reader: R,
    columns: Vec<Column>,
    delimiter: String,
    line_number: usize,
}

impl<R: BufRead> AsciiReader<R> {
    /// Creates a reader for the given `format` (see [parse_format]). A `delimiter` consisting only of whitespace
    /// splits at any run of whitespace
    pub fn from_read(read: R, format: &str, delimiter: &str) -> Result<Self> {
        Ok(Self {
            reader: read,
            columns: parse_format(format)?,
            delimiter: delimiter.to_string(),
            line_number: 0,
        })
    }

    /// Reads the next point, or `None` at the end of the input
    pub fn read_point(&mut self) -> Result<Option<PointRecord>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let point = self
                .parse_line(trimmed)
                .with_context(|| format!("Invalid point in line {}", self.line_number))?;
            return Ok(Some(point));
        }
    }

    /// Reads all remaining points
    pub fn read_all(&mut self) -> Result<Vec<PointRecord>> {
        let mut points = vec![];
        while let Some(point) = self.read_point()? {
            points.push(point);
        }
        Ok(points)
    }

    fn parse_line(&self, line: &str) -> Result<PointRecord> {
        let values: Box<dyn Iterator<Item = &str> + '_> = if self.delimiter.trim().is_empty() {
            Box::new(line.split_whitespace())
        } else {
            Box::new(line.split(self.delimiter.as_str()).map(str::trim))
        };
        let mut point = PointRecord::at(0.0, 0.0, 0.0);
        for pair in values.zip_longest(self.columns.iter()) {
            match pair {
                Both(value, column) => match column {
                    Column::X => point.position.x = parse_value(value, column)?,
                    Column::Y => point.position.y = parse_value(value, column)?,
                    Column::Z => point.position.z = parse_value(value, column)?,
                    Column::Intensity => point.intensity = parse_value(value, column)?,
                    Column::ReturnNumber => point.return_number = parse_value(value, column)?,
                    Column::NumberOfReturns => {
                        point.number_of_returns = parse_value(value, column)?
                    }
                    Column::Classification => point.classification = parse_value(value, column)?,
                    Column::Skip | Column::HeightAboveGround => {}
                },
                Left(_) => break,
                Right(_) => {
                    bail!("Format string expected more values in the line. Found end of line")
                }
            }
        }
        Ok(point)
    }
}

impl AsciiReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P, format: &str, delimiter: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
        Self::from_read(BufReader::new(file), format, delimiter)
    }
}

impl<R: Read> AsciiReader<BufReader<R>> {
    /// Wraps an unbuffered `read` in a [BufReader]
    pub fn from_unbuffered(read: R, format: &str, delimiter: &str) -> Result<Self> {
        Self::from_read(BufReader::new(read), format, delimiter)
    }
}

fn parse_value<V: FromStr>(value: &str, column: &Column) -> Result<V> {
    value.parse::<V>().map_err(|_| {
        anyhow!(
            "Expected {} for column {} but found '{}'",
            std::any::type_name::<V>(),
            column,
            value
        )
    })
}
