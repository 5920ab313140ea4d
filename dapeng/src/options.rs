use seqmer::{Encoder, ScoreScheme, Spacer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Error, ErrorKind, Result};
use std::path::Path;

/// Encoder parameters recorded next to the table so classification
/// reproduces the build exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexOptions {
    pub k: u32,
    pub w: u32,
    pub gaps: Vec<u32>,
    pub canonical: bool,
    pub scheme: String,
    pub tax_depth: bool,
}

impl IndexOptions {
    pub fn from_encoder(encoder: &Encoder, tax_depth: bool) -> Self {
        let spacer = encoder.spacer();
        Self {
            k: spacer.k() as u32,
            w: spacer.w() as u32,
            gaps: spacer.gaps().to_vec(),
            canonical: encoder.is_canonical(),
            scheme: scheme_name(encoder.scheme()).to_string(),
            tax_depth,
        }
    }

    pub fn scheme(&self) -> Result<ScoreScheme> {
        parse_scheme(&self.scheme)
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }

    pub fn as_encoder(&self) -> Result<Encoder> {
        let spacer = Spacer::new(self.k, self.w, self.gaps.clone())?;
        Ok(Encoder::new(spacer, self.canonical, self.scheme()?))
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(crate::utils::open_file(&path)?);
        serde_json::from_reader(reader).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("Malformed options file {:?}: {}", path.as_ref(), e),
            )
        })
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self).map_err(Error::from)
    }
}

pub fn scheme_name(scheme: ScoreScheme) -> &'static str {
    match scheme {
        ScoreScheme::Lex => "lex",
        ScoreScheme::Entropy => "entropy",
    }
}

pub fn parse_scheme(name: &str) -> std::result::Result<ScoreScheme, String> {
    match name {
        "lex" => Ok(ScoreScheme::Lex),
        "entropy" => Ok(ScoreScheme::Entropy),
        other => Err(format!("unknown score scheme {:?}, expected lex or entropy", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let options = IndexOptions {
            k: 13,
            w: 19,
            gaps: vec![1; 6],
            canonical: true,
            scheme: "lex".to_string(),
            tax_depth: false,
        };
        let text = serde_json::to_string(&options).unwrap();
        let back: IndexOptions = serde_json::from_str(&text).unwrap();
        assert_eq!(back.k, 13);
        assert_eq!(back.gaps, vec![1; 6]);
        let encoder = back.as_encoder().unwrap();
        assert_eq!(encoder.covered(), 19);
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        assert!(parse_scheme("md5").is_err());
        assert!(parse_scheme("entropy").is_ok());
    }
}
