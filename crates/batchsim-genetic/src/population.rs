//! Binary persistence of populations and chromosomes.
//!
//! Layout, all little-endian: header `"GAP1"`, count u32, gene_count u32,
//! then per chromosome `age u32, kind u8, fitness_present u8, fitness f64 if
//! present, genes f64 * gene_count`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::chromosome::{Chromosome, ChromosomeKind, GENE_COUNT};

pub const POPULATION_MAGIC: &[u8; 4] = b"GAP1";

#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("bad population file magic")]
    BadMagic,

    /// The stored shape does not match this build's population constants.
    #[error("incompatible population: expected {expected}, found {found}")]
    Incompatible { expected: usize, found: usize },

    #[error("corrupt chromosome record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn save_population<P: AsRef<Path>>(population: &[Chromosome], path: P) -> Result<(), std::io::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(POPULATION_MAGIC)?;
    write_u32(&mut writer, population.len() as u32)?;
    write_u32(&mut writer, GENE_COUNT as u32)?;
    for chromosome in population {
        write_chromosome(&mut writer, chromosome)?;
    }
    writer.flush()
}

pub fn load_population<P: AsRef<Path>>(path: P) -> Result<Vec<Chromosome>, PopulationError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != POPULATION_MAGIC {
        return Err(PopulationError::BadMagic);
    }
    let count = read_u32(&mut reader)? as usize;
    let gene_count = read_u32(&mut reader)? as usize;
    if gene_count != GENE_COUNT {
        return Err(PopulationError::Incompatible {
            expected: GENE_COUNT,
            found: gene_count,
        });
    }
    let mut population = Vec::with_capacity(count);
    for _ in 0..count {
        population.push(read_chromosome(&mut reader)?);
    }
    Ok(population)
}

pub(crate) fn save_chromosome<P: AsRef<Path>>(chromosome: &Chromosome, path: P) -> Result<(), std::io::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_chromosome(&mut writer, chromosome)?;
    writer.flush()
}

pub(crate) fn load_chromosome<P: AsRef<Path>>(path: P) -> Result<Chromosome, PopulationError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_chromosome(&mut reader)
}

fn write_chromosome<W: Write>(writer: &mut W, chromosome: &Chromosome) -> Result<(), std::io::Error> {
    write_u32(writer, chromosome.age())?;
    writer.write_all(&[chromosome.kind().as_u8()])?;
    match chromosome.cached_fitness() {
        Some(fitness) => {
            writer.write_all(&[1])?;
            write_f64(writer, fitness)?;
        }
        None => writer.write_all(&[0])?,
    }
    for &gene in chromosome.genes() {
        write_f64(writer, gene)?;
    }
    Ok(())
}

fn read_chromosome<R: Read>(reader: &mut R) -> Result<Chromosome, PopulationError> {
    let age = read_u32(reader)?;
    let kind = ChromosomeKind::from_u8(read_u8(reader)?)
        .ok_or_else(|| PopulationError::Corrupt("unknown chromosome kind".to_owned()))?;
    let fitness = match read_u8(reader)? {
        0 => None,
        1 => Some(read_f64(reader)?),
        other => {
            return Err(PopulationError::Corrupt(format!(
                "bad fitness-present flag: {}",
                other
            )))
        }
    };
    let mut genes = Vec::with_capacity(GENE_COUNT);
    for _ in 0..GENE_COUNT {
        genes.push(read_f64(reader)?);
    }
    Ok(Chromosome::from_parts(genes, age, kind, fitness))
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<(), std::io::Error> {
    writer.write_all(&value.to_le_bytes())
}

fn write_f64<W: Write>(writer: &mut W, value: f64) -> Result<(), std::io::Error> {
    writer.write_all(&value.to_le_bytes())
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8, std::io::Error> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, std::io::Error> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64, std::io::Error> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}
