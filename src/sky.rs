//! Star catalog

use crate::{
    io::{self, IoError},
    metrology::OpdMetrology,
    phosim,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Star
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub id: usize,
    /// right ascension in degrees
    pub ra: f64,
    /// declination in degrees
    pub dec: f64,
    pub magnitude: f64,
}

/// Sky simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkySim {
    stars: Vec<Star>,
}
impl SkySim {
    pub fn new() -> Self {
        Default::default()
    }
    /// Adds a star, a negative right ascension is wrapped into [0,360[ degrees
    pub fn add_star(&mut self, id: usize, ra: f64, dec: f64, magnitude: f64) -> &mut Self {
        let ra = if ra < 0. { ra + 360. } else { ra };
        self.stars.push(Star {
            id,
            ra,
            dec,
            magnitude,
        });
        self
    }
    /// Puts a star of magnitude `magnitude` at each OPD field point
    pub fn from_opd(metrology: &OpdMetrology, magnitude: f64) -> Self {
        let mut sky = Self::new();
        metrology.fields().enumerate().for_each(|(id, (x, y))| {
            sky.add_star(id, x, y, magnitude);
        });
        sky
    }
    /// Reads the stars from a sky file
    ///
    /// One star per line: `id ra dec magnitude`
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let mut sky = Self::new();
        for (line, row) in io::load_rows(path)?.into_iter().enumerate() {
            match row.as_slice() {
                [id, ra, dec, magnitude] => {
                    sky.add_star(*id as usize, *ra, *dec, *magnitude);
                }
                _ => {
                    return Err(IoError::Ragged {
                        line: line + 1,
                        found: row.len(),
                        expected: 4,
                        path: path.to_path_buf(),
                    })
                }
            }
        }
        Ok(sky)
    }
    pub fn stars(&self) -> &[Star] {
        &self.stars
    }
    pub fn len(&self) -> usize {
        self.stars.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
    /// Writes the stars into a sky file
    pub fn export<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| IoError::Create(e, path.to_path_buf()))?;
        let mut buffer = BufWriter::new(file);
        let mut content = String::from("# Id\t Ra\t\t Dec\t\t Mag\n");
        for star in &self.stars {
            content.push_str(&format!(
                "{}\t {:3.6}\t {:3.6}\t {:3.6}\n",
                star.id, star.ra, star.dec, star.magnitude
            ));
        }
        buffer
            .write_all(content.as_bytes())
            .and_then(|_| buffer.flush())
            .map_err(|e| IoError::Write(e, path.to_path_buf()))
    }
    /// PhoSim `object` statements of the stars
    pub fn phosim_objects(&self, sed: &str) -> String {
        self.stars
            .iter()
            .map(|s| phosim::star(s.id, s.ra, s.dec, s.magnitude, sed))
            .collect()
    }
}
