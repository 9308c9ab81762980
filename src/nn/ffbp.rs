use crate::nn::{NetworkDefinition, NeuralNetwork};
use crate::types::{AcError, AcResult};
use ndarray::{Array1, Array2};
use std::sync::Arc;

/// Parsed feed-forward back-propagation network.
///
/// Text layout:
/// ```text
/// <free header text>
/// #
/// <n_in>
/// <min> <max>        (n_in lines)
/// <n_out>
/// <min> <max>        (n_out lines)
/// ... =<n_planes> <size_0> ... <size_n-1>
/// bias <label>       (one section per plane transition)
/// <values>
/// wgt <label>        (one section per plane transition, row-major)
/// <values>
/// ```
#[derive(Debug)]
pub struct FfbpWeights {
    inmin: Vec<f64>,
    inmax: Vec<f64>,
    outmin: Vec<f64>,
    outmax: Vec<f64>,
    sizes: Vec<usize>,
    bias: Vec<Array1<f64>>,
    wgt: Vec<Array2<f64>>,
}

/// Immutable network definition, shared by all workers
#[derive(Debug, Clone)]
pub struct FfbpDefinition {
    weights: Arc<FfbpWeights>,
}

impl FfbpDefinition {
    /// Parse a network from its text definition
    pub fn parse(text: &str) -> AcResult<Self> {
        let weights = parse_weights(text)?;
        log::debug!(
            "Parsed network with planes {:?} ({} inputs, {} outputs)",
            weights.sizes,
            weights.inmin.len(),
            weights.outmin.len()
        );
        Ok(Self {
            weights: Arc::new(weights),
        })
    }

    /// Evaluation context owning its own activation buffers
    pub fn context(&self) -> FfbpContext {
        let activations = self.weights.sizes.iter().map(|&n| Array1::zeros(n)).collect();
        FfbpContext {
            weights: Arc::clone(&self.weights),
            activations,
        }
    }

    pub fn input_min(&self) -> &[f64] {
        &self.weights.inmin
    }

    pub fn input_max(&self) -> &[f64] {
        &self.weights.inmax
    }

    pub fn plane_sizes(&self) -> &[usize] {
        &self.weights.sizes
    }
}

impl NetworkDefinition for FfbpDefinition {
    fn create_context(&self) -> Box<dyn NeuralNetwork + Send> {
        Box::new(self.context())
    }

    fn input_count(&self) -> usize {
        self.weights.inmin.len()
    }

    fn output_count(&self) -> usize {
        self.weights.outmin.len()
    }
}

/// Per-worker evaluation state over a shared definition
#[derive(Debug)]
pub struct FfbpContext {
    weights: Arc<FfbpWeights>,
    activations: Vec<Array1<f64>>,
}

impl NeuralNetwork for FfbpContext {
    fn evaluate(&mut self, input: &[f64]) -> Vec<f64> {
        let w = &self.weights;
        debug_assert_eq!(input.len(), w.inmin.len());

        let first = &mut self.activations[0];
        for (i, value) in input.iter().enumerate() {
            first[i] = (value - w.inmin[i]) / (w.inmax[i] - w.inmin[i]);
        }

        for plane in 0..w.sizes.len() - 1 {
            let (lower, upper) = self.activations.split_at_mut(plane + 1);
            let act_in = &lower[plane];
            let act_out = &mut upper[0];
            let weights = &w.wgt[plane];
            let bias = &w.bias[plane];
            for i in 0..act_out.len() {
                act_out[i] = sigmoid(bias[i] + weights.row(i).dot(act_in));
            }
        }

        let last = &self.activations[w.sizes.len() - 1];
        last.iter()
            .enumerate()
            .map(|(i, &a)| a * (w.outmax[i] - w.outmin[i]) + w.outmin[i])
            .collect()
    }

    fn input_min(&self) -> &[f64] {
        &self.weights.inmin
    }

    fn input_max(&self) -> &[f64] {
        &self.weights.inmax
    }

    fn output_count(&self) -> usize {
        self.weights.outmin.len()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn parse_weights(text: &str) -> AcResult<FfbpWeights> {
    let mut lines = text.lines();

    // Free header text up to the first line starting with '#'
    if !lines.by_ref().any(|line| line.trim_start().starts_with('#')) {
        return Err(AcError::InvalidFormat("network definition has no '#' header marker".to_string()));
    }

    // Ranges section: numeric tokens until the plane line containing '='
    let mut numbers = Vec::new();
    let mut plane_line = None;
    for line in lines.by_ref() {
        if let Some(pos) = line.find('=') {
            plane_line = Some(line[pos + 1..].to_string());
            break;
        }
        numbers.extend(line.split_whitespace().filter_map(|tok| tok.parse::<f64>().ok()));
    }
    let plane_line = plane_line
        .ok_or_else(|| AcError::InvalidFormat("network definition has no plane size line".to_string()))?;

    let mut cursor = numbers.into_iter();
    let n_in = take_count(&mut cursor, "input count")?;
    let (inmin, inmax) = take_ranges(&mut cursor, n_in, "input")?;
    let n_out = take_count(&mut cursor, "output count")?;
    let (outmin, outmax) = take_ranges(&mut cursor, n_out, "output")?;

    let plane_numbers: Vec<usize> = plane_line
        .split_whitespace()
        .map(|tok| {
            tok.parse::<usize>()
                .map_err(|_| AcError::InvalidFormat(format!("invalid plane size token '{}'", tok)))
        })
        .collect::<AcResult<_>>()?;
    let (&n_planes, sizes) = plane_numbers
        .split_first()
        .ok_or_else(|| AcError::InvalidFormat("empty plane size line".to_string()))?;
    if n_planes < 2 || sizes.len() < n_planes {
        return Err(AcError::InvalidFormat(format!(
            "network declares {} planes but lists {} sizes",
            n_planes,
            sizes.len()
        )));
    }
    let sizes = sizes[..n_planes].to_vec();
    if sizes[0] != n_in || sizes[n_planes - 1] != n_out {
        return Err(AcError::InvalidFormat(format!(
            "plane sizes {:?} do not match {} inputs and {} outputs",
            sizes, n_in, n_out
        )));
    }

    let body: Vec<&str> = lines.collect();
    let mut sections = SectionReader::new(&body);

    let mut bias = Vec::with_capacity(n_planes - 1);
    for plane in 0..n_planes - 1 {
        let values = sections.next_section(sizes[plane + 1])?;
        bias.push(Array1::from_vec(values));
    }

    let mut wgt = Vec::with_capacity(n_planes - 1);
    for plane in 0..n_planes - 1 {
        let (rows, cols) = (sizes[plane + 1], sizes[plane]);
        let values = sections.next_section(rows * cols)?;
        let matrix = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| AcError::InvalidFormat(format!("weight matrix shape error: {}", e)))?;
        wgt.push(matrix);
    }

    for i in 0..n_in {
        if inmax[i] <= inmin[i] {
            return Err(AcError::InvalidFormat(format!(
                "input {} has an empty training range [{}, {}]",
                i, inmin[i], inmax[i]
            )));
        }
    }

    Ok(FfbpWeights {
        inmin,
        inmax,
        outmin,
        outmax,
        sizes,
        bias,
        wgt,
    })
}

fn take_count(cursor: &mut impl Iterator<Item = f64>, what: &str) -> AcResult<usize> {
    let value = cursor
        .next()
        .ok_or_else(|| AcError::InvalidFormat(format!("network definition is missing the {}", what)))?;
    if value < 1.0 || value.fract() != 0.0 {
        return Err(AcError::InvalidFormat(format!("invalid {} {}", what, value)));
    }
    Ok(value as usize)
}

fn take_ranges(
    cursor: &mut impl Iterator<Item = f64>,
    count: usize,
    what: &str,
) -> AcResult<(Vec<f64>, Vec<f64>)> {
    let mut min = Vec::with_capacity(count);
    let mut max = Vec::with_capacity(count);
    for i in 0..count {
        match (cursor.next(), cursor.next()) {
            (Some(lo), Some(hi)) => {
                min.push(lo);
                max.push(hi);
            }
            _ => {
                return Err(AcError::InvalidFormat(format!(
                    "network definition is missing the {} range {}",
                    what, i
                )))
            }
        }
    }
    Ok((min, max))
}

/// Reads labelled numeric sections ("bias 1 31" followed by values)
struct SectionReader<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Self { lines, pos: 0 }
    }

    fn next_section(&mut self, count: usize) -> AcResult<Vec<f64>> {
        // Skip to the next label line
        while self.pos < self.lines.len() {
            let first = self.lines[self.pos].split_whitespace().next();
            self.pos += 1;
            if matches!(first, Some(tok) if tok.parse::<f64>().is_err()) {
                break;
            }
        }

        let mut values = Vec::with_capacity(count);
        while values.len() < count && self.pos < self.lines.len() {
            for tok in self.lines[self.pos].split_whitespace() {
                let value = tok
                    .parse::<f64>()
                    .map_err(|_| AcError::InvalidFormat(format!("invalid number '{}' in network section", tok)))?;
                values.push(value);
            }
            self.pos += 1;
        }

        if values.len() != count {
            return Err(AcError::InvalidFormat(format!(
                "network section has {} values, expected {}",
                values.len(),
                count
            )));
        }
        Ok(values)
    }
}
