// src/seeds.rs - Seed file parsing

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::adjacency::GridShape;
use crate::errors::{IftError, Result};

/// Label given to seeds listed without one
pub const DEFAULT_SEED_LABEL: u32 = 1;

/// A seed node and the label its tree carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed {
    pub node: usize,
    pub label: u32,
}

impl Seed {
    pub fn new(node: usize, label: u32) -> Self {
        Self { node, label }
    }
}

/// Parse a seed list.
///
/// The first token is the number of coordinates per seed and must match the
/// grid. Every following line holds one seed: its coordinates, first axis
/// first, optionally followed by a label. Text after `#` is ignored.
pub fn parse_seeds(text: &str, shape: &GridShape) -> Result<Vec<Seed>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.split('#').next().unwrap_or("").trim()))
        .filter(|(_, line)| !line.is_empty());

    let (header_line, header) = lines.next().ok_or_else(|| IftError::SeedParse {
        line: 1,
        message: "missing dimension header".to_string(),
    })?;
    let mut header_tokens = header.split_whitespace();
    let dims: usize = header_tokens
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| IftError::SeedParse {
            line: header_line,
            message: format!("invalid dimension header '{}'", header),
        })?;
    if dims != shape.ndims() {
        return Err(IftError::SeedParse {
            line: header_line,
            message: format!(
                "seeds have {} dimensions but the image has {}",
                dims,
                shape.ndims()
            ),
        });
    }

    // The header may share its line with the first seed
    let rest: Vec<&str> = header_tokens.collect();
    let header_seed = (!rest.is_empty()).then(|| (header_line, rest));

    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    let body = lines.map(|(line, text)| (line, text.split_whitespace().collect::<Vec<_>>()));
    for (line, tokens) in header_seed.into_iter().chain(body) {
        let seed = parse_seed_line(line, &tokens, shape)?;
        if !seen.insert(seed.node) {
            return Err(IftError::SeedParse {
                line,
                message: format!("duplicate seed at node {}", seed.node),
            });
        }
        seeds.push(seed);
    }

    debug!("Parsed {} seeds", seeds.len());
    Ok(seeds)
}

fn parse_seed_line(line: usize, tokens: &[&str], shape: &GridShape) -> Result<Seed> {
    let dims = shape.ndims();
    if tokens.len() != dims && tokens.len() != dims + 1 {
        return Err(IftError::SeedParse {
            line,
            message: format!(
                "expected {} coordinates and an optional label, found {} values",
                dims,
                tokens.len()
            ),
        });
    }

    let coords = tokens[..dims]
        .iter()
        .map(|token| {
            token.parse::<usize>().map_err(|_| IftError::SeedParse {
                line,
                message: format!("invalid coordinate '{}'", token),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let node = shape.index(&coords).ok_or_else(|| IftError::SeedParse {
        line,
        message: format!("coordinates {:?} fall outside {:?}", coords, shape.dims()),
    })?;

    let label = match tokens.get(dims) {
        Some(token) => token.parse::<u32>().map_err(|_| IftError::SeedParse {
            line,
            message: format!("invalid label '{}'", token),
        })?,
        None => DEFAULT_SEED_LABEL,
    };

    Ok(Seed { node, label })
}

/// Read and parse a seed file
pub fn load_seeds<P: AsRef<Path>>(path: P, shape: &GridShape) -> Result<Vec<Seed>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(IftError::InvalidPath(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    parse_seeds(&text, shape)
}

/// Nodes of `seeds`, in file order
pub fn seed_nodes(seeds: &[Seed]) -> Vec<usize> {
    seeds.iter().map(|seed| seed.node).collect()
}
