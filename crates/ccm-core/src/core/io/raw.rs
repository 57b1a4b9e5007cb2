use crate::core::alphabet::{NUM_AMINO_ACIDS, NUM_STATES};
use crate::core::models::params::{PairParams, SingleParams};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RawError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Inconsistent data: {0}")]
    Inconsistent(String),
}

/// A complete set of model parameters: fields and couplings for `ncol` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawParams {
    pub single: SingleParams,
    pub pair: PairParams,
}

impl RawParams {
    pub fn new(single: SingleParams, pair: PairParams) -> Result<Self, RawError> {
        if single.ncol() != pair.ncol() {
            return Err(RawError::Inconsistent(format!(
                "single parameters cover {} columns but pair parameters cover {}",
                single.ncol(),
                pair.ncol()
            )));
        }
        Ok(Self { single, pair })
    }

    pub fn ncol(&self) -> usize {
        self.single.ncol()
    }

    /// Reads the plain-text raw format.
    ///
    /// The file holds `L` lines of 20 single values, then for each column pair
    /// `i < j` a `# i j` header followed by 21 lines of 21 coupling values.
    /// Lines starting with `#>` carry metadata and are skipped.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, RawError> {
        let mut single_rows: Vec<Vec<f64>> = Vec::new();
        let mut blocks: Vec<((usize, usize), Vec<Vec<f64>>)> = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with("#>") {
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('#') {
                let indices = parse_values::<usize>(header, line_num)?;
                let [i, j] = indices.as_slice() else {
                    return Err(RawError::Parse {
                        line: line_num,
                        message: format!("pair header needs two column indices, got '{trimmed}'"),
                    });
                };
                blocks.push(((*i, *j), Vec::with_capacity(NUM_STATES)));
                continue;
            }

            let values = parse_values::<f64>(trimmed, line_num)?;
            match blocks.last_mut() {
                None => {
                    if values.len() != NUM_AMINO_ACIDS {
                        return Err(RawError::Parse {
                            line: line_num,
                            message: format!(
                                "single row needs {NUM_AMINO_ACIDS} values, got {}",
                                values.len()
                            ),
                        });
                    }
                    single_rows.push(values);
                }
                Some((_, rows)) => {
                    if values.len() != NUM_STATES || rows.len() == NUM_STATES {
                        return Err(RawError::Parse {
                            line: line_num,
                            message: format!(
                                "pair blocks are {NUM_STATES} rows of {NUM_STATES} values"
                            ),
                        });
                    }
                    rows.push(values);
                }
            }
        }

        let ncol = single_rows.len();
        if ncol == 0 {
            return Err(RawError::Inconsistent("no single parameters found".into()));
        }

        let mut single = SingleParams::zeros(ncol);
        for (i, row) in single_rows.iter().enumerate() {
            for (a, &value) in row.iter().enumerate() {
                single.set(i, a, value);
            }
        }

        let mut pair = PairParams::zeros(ncol);
        for ((i, j), rows) in &blocks {
            let (i, j) = (*i, *j);
            if i >= ncol || j >= ncol || i == j {
                return Err(RawError::Inconsistent(format!(
                    "pair block ({i}, {j}) is invalid for {ncol} columns"
                )));
            }
            if rows.len() != NUM_STATES {
                return Err(RawError::Inconsistent(format!(
                    "pair block ({i}, {j}) has {} rows",
                    rows.len()
                )));
            }
            for (a, row) in rows.iter().enumerate() {
                for (b, &value) in row.iter().enumerate() {
                    pair.set(i, j, a, b, value);
                    pair.set(j, i, b, a, value);
                }
            }
        }

        Ok(Self { single, pair })
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), RawError> {
        let ncol = self.ncol();
        for i in 0..ncol {
            let row: Vec<String> = (0..NUM_AMINO_ACIDS)
                .map(|a| self.single.get(i, a).to_string())
                .collect();
            writeln!(writer, "{}", row.join("\t"))?;
        }
        for i in 0..ncol {
            for j in (i + 1)..ncol {
                writeln!(writer, "# {i} {j}")?;
                for a in 0..NUM_STATES {
                    let row: Vec<String> = (0..NUM_STATES)
                        .map(|b| self.pair.get(i, j, a, b).to_string())
                        .collect();
                    writeln!(writer, "{}", row.join("\t"))?;
                }
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RawError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    pub fn save(&self, path: &Path) -> Result<(), RawError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn parse_values<T: std::str::FromStr>(text: &str, line: usize) -> Result<Vec<T>, RawError> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<T>().map_err(|_| RawError::Parse {
                line,
                message: format!("invalid number '{token}'"),
            })
        })
        .collect()
}
