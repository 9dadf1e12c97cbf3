//! Parser for Stim circuit text.
//!
//! Accepts one instruction per line in the form `NAME(args) targets...`,
//! `#` comments, and nested `REPEAT n { ... }` blocks. Repeat blocks are
//! expanded so the resulting instruction stream is exactly the program order
//! a sampler executes, which is what measurement positions are relative to.

use anyhow::{Context, Result, anyhow, bail};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while1};
use nom::character::complete::{
    char, i32 as parse_i32, one_of, space0, space1, u32 as parse_u32, u64 as parse_u64,
};
use nom::combinator::{all_consuming, map, opt, value, verify};
use nom::multi::{many0, many1, separated_list0};
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use qmap_common::isa::{GateKind, Instruction, PauliBasis, Target};
use qmap_core::coords::{Coord, CoordinateMap};
use std::path::Path;
use tracing::debug;

/// A parsed circuit with repeat blocks flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    instructions: Vec<Instruction>,
}

impl Circuit {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Final qubit coordinates.
    ///
    /// `QUBIT_COORDS` assignments are offset by the `SHIFT_COORDS` total
    /// accumulated so far; later assignments override earlier ones. Missing
    /// components default to zero, so one-dimensional layouts lie on `y = 0`.
    pub fn qubit_coords(&self) -> CoordinateMap {
        let mut shift = [0.0f64; 2];
        let mut coords = CoordinateMap::new();

        for inst in &self.instructions {
            match inst.name.as_str() {
                "SHIFT_COORDS" => {
                    for (s, a) in shift.iter_mut().zip(&inst.args) {
                        *s += a;
                    }
                }
                "QUBIT_COORDS" => {
                    let x = inst.args.first().copied().unwrap_or(0.0) + shift[0];
                    let y = inst.args.get(1).copied().unwrap_or(0.0) + shift[1];
                    for q in inst.qubit_targets() {
                        coords.insert(q, Coord::new(x, y));
                    }
                }
                _ => {}
            }
        }

        coords
    }

    /// Number of measurement results one shot of this circuit records.
    pub fn num_measurements(&self) -> usize {
        self.instructions
            .iter()
            .filter(|inst| inst.kind().is_measurement())
            .map(|inst| {
                if inst.name == "MPP" {
                    let combiners = inst
                        .targets
                        .iter()
                        .filter(|t| matches!(t, Target::Combiner))
                        .count();
                    inst.targets.len() - 2 * combiners
                } else {
                    inst.qubit_targets().count()
                }
            })
            .sum()
    }
}

/// Reads and parses a circuit file.
pub fn load_circuit_file<P: AsRef<Path>>(path: P) -> Result<Circuit> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open circuit file {}", path.display()))?;
    parse_circuit(&text)
}

#[derive(Clone)]
enum Line {
    Instruction(Instruction),
    RepeatStart(u64),
    BlockEnd,
}

enum Node {
    Leaf(Instruction),
    Repeat(u64, Vec<Node>),
}

/// Parses circuit text, expanding repeat blocks.
pub fn parse_circuit(text: &str) -> Result<Circuit> {
    // Stack of open blocks; the bottom entry is the top level.
    let mut stack: Vec<(u64, Vec<Node>)> = vec![(1, Vec::new())];

    for (n, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let (_, line) = all_consuming(parse_line)(content)
            .map_err(|_| anyhow!("line {}: cannot parse {:?}", n + 1, content))?;

        match line {
            Line::Instruction(inst) => push_node(&mut stack, Node::Leaf(inst)),
            Line::RepeatStart(count) => stack.push((count, Vec::new())),
            Line::BlockEnd => {
                if stack.len() < 2 {
                    bail!("line {}: unmatched '}}'", n + 1);
                }
                if let Some((count, body)) = stack.pop() {
                    push_node(&mut stack, Node::Repeat(count, body));
                }
            }
        }
    }

    if stack.len() != 1 {
        bail!("unterminated REPEAT block");
    }

    let mut instructions = Vec::new();
    if let Some((_, top)) = stack.pop() {
        flatten(&top, &mut instructions);
    }
    debug!(instructions = instructions.len(), "parsed circuit");

    Ok(Circuit { instructions })
}

fn push_node(stack: &mut [(u64, Vec<Node>)], node: Node) {
    if let Some((_, body)) = stack.last_mut() {
        body.push(node);
    }
}

fn flatten(nodes: &[Node], out: &mut Vec<Instruction>) {
    for node in nodes {
        match node {
            Node::Leaf(inst) => out.push(inst.clone()),
            Node::Repeat(count, body) => {
                for _ in 0..*count {
                    flatten(body, out);
                }
            }
        }
    }
}

fn parse_line(input: &str) -> IResult<&str, Line> {
    alt((
        value(Line::BlockEnd, char('}')),
        map(
            delimited(
                pair(tag_no_case("REPEAT"), space1),
                parse_u64,
                pair(space0, char('{')),
            ),
            Line::RepeatStart,
        ),
        map(parse_instruction, Line::Instruction),
    ))(input)
}

fn parse_instruction(input: &str) -> IResult<&str, Instruction> {
    verify(
        map(
            tuple((
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
                opt(parse_args),
                many0(preceded(space1, many1(parse_target))),
                space0,
            )),
            |(name, args, groups, _)| {
                let targets = groups.into_iter().flatten().collect();
                Instruction::new(name, args.unwrap_or_default(), targets)
            },
        ),
        |inst: &Instruction| combiners_joined(&inst.targets),
    )(input)
}

/// Every `*` must sit between two Pauli terms, as in `X1*Z2`.
fn combiners_joined(targets: &[Target]) -> bool {
    let is_pauli = |t: Option<&Target>| matches!(t, Some(Target::Pauli { .. }));
    targets.iter().enumerate().all(|(i, t)| {
        !matches!(t, Target::Combiner)
            || (i > 0 && is_pauli(targets.get(i - 1)) && is_pauli(targets.get(i + 1)))
    })
}

fn parse_args(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(
        terminated(char('('), space0),
        separated_list0(delimited(space0, char(','), space0), double),
        preceded(space0, char(')')),
    )(input)
}

fn parse_target(input: &str) -> IResult<&str, Target> {
    alt((
        map(delimited(tag("rec["), parse_i32, char(']')), Target::Record),
        map(delimited(tag("sweep["), parse_u32, char(']')), Target::Sweep),
        value(Target::Combiner, char('*')),
        map(
            pair(opt(char('!')), pair(one_of("XYZxyz"), parse_u32)),
            |(inv, (basis, index))| Target::Pauli {
                basis: match basis.to_ascii_uppercase() {
                    'X' => PauliBasis::X,
                    'Y' => PauliBasis::Y,
                    _ => PauliBasis::Z,
                },
                index,
                inverted: inv.is_some(),
            },
        ),
        map(pair(opt(char('!')), parse_u32), |(inv, index)| Target::Qubit {
            index,
            inverted: inv.is_some(),
        }),
    ))(input)
}

/// Counts qubits per gate kind; used for log summaries.
pub fn kind_histogram(circuit: &Circuit) -> [(GateKind, usize); 3] {
    let mut counts = [
        (GateKind::BasisChange, 0),
        (GateKind::MeasureReset, 0),
        (GateKind::Measure, 0),
    ];
    for inst in circuit.instructions() {
        if let Some(slot) = counts.iter_mut().find(|(k, _)| *k == inst.kind()) {
            slot.1 += inst.qubit_targets().count();
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_and_targets() {
        let text = "DEPOLARIZE2(0.001) 1 2\nDETECTOR(2, 0.5, 0) rec[-1] rec[-9]\nMPP X1*!Z2 Y3\n";
        let c = parse_circuit(text).unwrap();
        let insts = c.instructions();
        assert_eq!(insts.len(), 3);
        assert_eq!(insts[0].name, "DEPOLARIZE2");
        assert_eq!(insts[0].args, vec![0.001]);
        assert_eq!(insts[1].targets, vec![Target::Record(-1), Target::Record(-9)]);
        assert_eq!(insts[1].args, vec![2.0, 0.5, 0.0]);
        assert_eq!(
            insts[2].targets[2],
            Target::Pauli {
                basis: PauliBasis::Z,
                index: 2,
                inverted: true
            }
        );
        assert_eq!(c.num_measurements(), 2);
    }

    #[test]
    fn test_repeat_blocks_are_flattened() {
        let text = "\
R 0 1
REPEAT 2 {
  H 1
  REPEAT 3 {
    X_ERROR(0.1) 0
  }
  MR 1
}
M 0
";
        let c = parse_circuit(text).unwrap();
        let names: Vec<&str> = c.instructions().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names.len(), 1 + 2 * (1 + 3 + 1) + 1);
        assert_eq!(names[1], "H");
        assert_eq!(names[5], "MR");
        assert_eq!(names[6], "H");
        assert_eq!(c.num_measurements(), 3);
    }

    #[test]
    fn test_comments_and_case() {
        let c = parse_circuit("# header\nmr 3 4 # trailing\n\ntick\n").unwrap();
        assert_eq!(c.instructions()[0].name, "MR");
        assert_eq!(c.instructions()[1].name, "TICK");
        assert!(c.instructions()[1].targets.is_empty());
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse_circuit("H 0\nCX 0 @1\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_circuit("REPEAT 2 {\nH 0\n").is_err());
        assert!(parse_circuit("H 0\n}\n").is_err());
    }

    #[test]
    fn test_dangling_combiner_rejected() {
        for text in ["MPP *", "MPP X1*", "MPP *Z2", "MPP X1**Z2", "MPP 1*2"] {
            let err = parse_circuit(text).unwrap_err();
            assert!(err.to_string().contains("cannot parse"), "{text:?}: {err}");
        }
        let err = parse_circuit("H 0\nMPP X1*\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let c = parse_circuit("MPP X1*Z2*Y3 !X4").unwrap();
        assert_eq!(c.num_measurements(), 2);
    }

    #[test]
    fn test_qubit_coords_with_shift() {
        let text = "\
QUBIT_COORDS(1, 1) 0
QUBIT_COORDS(3) 1
SHIFT_COORDS(0, 2)
QUBIT_COORDS(1, 1) 2
QUBIT_COORDS(5, 5) 0
";
        let coords = parse_circuit(text).unwrap().qubit_coords();
        assert_eq!(coords.get(0), Some(Coord::new(5.0, 7.0)));
        assert_eq!(coords.get(1), Some(Coord::new(3.0, 0.0)));
        assert_eq!(coords.get(2), Some(Coord::new(1.0, 3.0)));
        assert_eq!(coords.len(), 3);
    }

    #[test]
    fn test_kind_histogram() {
        let c = parse_circuit("H 1 2\nMR 1 2 3\nM 0\nCX 1 0\n").unwrap();
        let hist = kind_histogram(&c);
        assert_eq!(hist[0], (GateKind::BasisChange, 2));
        assert_eq!(hist[1], (GateKind::MeasureReset, 3));
        assert_eq!(hist[2], (GateKind::Measure, 1));
    }
}
