//! Parser for `.shp` shape files.
//!
//! A shape file is a sequence of statements such as
//!
//! ```text
//! # beam pipe
//! background(32, 32, 32, 1)
//! cylinder(0, 0, 0, 0, 0, 100, 5, 180, 180, 180, 0.5, "pipe")
//! sphere(0, 0, 50, 10, 255, 0, 0, 1)
//! ```
//!
//! Colour components are integers in 0..=255 followed by an opacity in 0..=1.
//! Shapes take an optional trailing quoted comment.

use std::collections::BTreeMap;
use std::io::Read;

use workbench_jobs::{JobMonitor, ParseError, StructureBuilder};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Sphere { center: Point, radius: f64 },
    Box { corner1: Point, corner2: Point },
    Cylinder { start: Point, end: Point, radius: f64 },
    Cone { base: Point, tip: Point, radius: f64 },
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Sphere { .. } => "sphere",
            ShapeKind::Box { .. } => "box",
            ShapeKind::Cylinder { .. } => "cylinder",
            ShapeKind::Cone { .. } => "cone",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub color: Color,
    pub comment: Option<String>,
}

/// Parsed contents of a shape file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    pub background: Option<Color>,
    pub shapes: Vec<Shape>,
}

impl Structure {
    /// Number of shapes per kind name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for shape in &self.shapes {
            *counts.entry(shape.kind.name()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShapeBuilder;

impl StructureBuilder for ShapeBuilder {
    type Structure = Structure;

    fn build(
        &self,
        stream: &mut dyn Read,
        monitor: &JobMonitor,
    ) -> Result<Option<Structure>, ParseError> {
        let mut text = String::new();
        stream
            .read_to_string(&mut text)
            .map_err(|err| ParseError::new(format!("cannot read shape data: {err}")))?;
        let structure = parse_shapes(&text)?;
        if let Some(structure) = &structure {
            monitor.worked(structure.shapes.len() as u64);
        }
        Ok(structure)
    }
}

/// Parses shape file text. Text without any statement yields `None`.
pub fn parse_shapes(text: &str) -> Result<Option<Structure>, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut structure = Structure::default();
    let mut statements = 0;

    while let Some(statement) = parser.statement()? {
        statements += 1;
        apply(&mut structure, statement)?;
    }

    Ok((statements > 0).then_some(structure))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Open,
    Close,
    Comma,
}

#[derive(Debug)]
struct Spanned {
    token: Token,
    line: usize,
}

fn tokenize(text: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
            }
            '(' | ')' | ',' => {
                chars.next();
                let token = match c {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    _ => Token::Comma,
                };
                tokens.push(Spanned { token, line });
            }
            '"' => {
                chars.next();
                let start_line = line;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') => {
                            return Err(ParseError::at_line(start_line, "unterminated string"))
                        }
                        Some(c) => value.push(c),
                        None => return Err(ParseError::at_line(start_line, "unterminated string")),
                    }
                }
                tokens.push(Spanned {
                    token: Token::Str(value),
                    line: start_line,
                });
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    let exponent_sign = matches!(c, '-' | '+')
                        && literal.ends_with(|p: char| p == 'e' || p == 'E');
                    if c.is_ascii_digit()
                        || c == '.'
                        || c == 'e'
                        || c == 'E'
                        || exponent_sign
                        || (literal.is_empty() && matches!(c, '-' | '+'))
                    {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal.parse::<f64>().map_err(|_| {
                    ParseError::at_line(line, format!("invalid number '{literal}'"))
                })?;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    line,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned {
                    token: Token::Ident(ident),
                    line,
                });
            }
            other => {
                return Err(ParseError::at_line(
                    line,
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Number(f64),
    Str(String),
}

struct Statement {
    name: String,
    args: Vec<Arg>,
    line: usize,
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    fn statement(&mut self) -> Result<Option<Statement>, ParseError> {
        let (name, line) = match self.next() {
            None => return Ok(None),
            Some(Spanned {
                token: Token::Ident(name),
                line,
            }) => (name.clone(), *line),
            Some(Spanned { token, line }) => {
                return Err(ParseError::at_line(
                    *line,
                    format!("expected a statement, found {token:?}"),
                ))
            }
        };

        match self.next() {
            Some(Spanned {
                token: Token::Open, ..
            }) => {}
            _ => return Err(ParseError::at_line(line, format!("expected '(' after {name}"))),
        }

        let mut args = Vec::new();
        loop {
            let eof_line = self.last_line();
            let Some(Spanned { token, line: arg_line }) = self.next() else {
                return Err(ParseError::at_line(eof_line, format!("unterminated {name}(...)")));
            };
            match token {
                Token::Close if args.is_empty() => break,
                Token::Number(value) => args.push(Arg::Number(*value)),
                Token::Str(value) => args.push(Arg::Str(value.clone())),
                other => {
                    return Err(ParseError::at_line(
                        *arg_line,
                        format!("expected an argument, found {other:?}"),
                    ))
                }
            }
            match self.next() {
                Some(Spanned {
                    token: Token::Comma, ..
                }) => {}
                Some(Spanned {
                    token: Token::Close, ..
                }) => break,
                Some(Spanned { line, .. }) => {
                    return Err(ParseError::at_line(*line, "expected ',' or ')'"))
                }
                None => {
                    return Err(ParseError::at_line(eof_line, format!("unterminated {name}(...)")))
                }
            }
        }

        Ok(Some(Statement { name, args, line }))
    }
}

fn apply(structure: &mut Structure, statement: Statement) -> Result<(), ParseError> {
    let Statement { name, args, line } = statement;
    let (numbers, comment) = split_args(&name, args, line)?;

    let expected = match name.as_str() {
        "background" => 4,
        "sphere" => 8,
        "box" => 10,
        "cylinder" | "cone" => 11,
        _ => return Err(ParseError::at_line(line, format!("unknown statement '{name}'"))),
    };
    if numbers.len() != expected {
        return Err(ParseError::at_line(
            line,
            format!(
                "{name} takes {expected} numbers, got {}",
                numbers.len()
            ),
        ));
    }

    let point = |i: usize| Point {
        x: numbers[i],
        y: numbers[i + 1],
        z: numbers[i + 2],
    };
    let color = color(&numbers[expected - 4..], line)?;

    let kind = match name.as_str() {
        "background" => {
            if comment.is_some() {
                return Err(ParseError::at_line(line, "background takes no comment"));
            }
            structure.background = Some(color);
            return Ok(());
        }
        "sphere" => ShapeKind::Sphere {
            center: point(0),
            radius: numbers[3],
        },
        "box" => ShapeKind::Box {
            corner1: point(0),
            corner2: point(3),
        },
        "cylinder" => ShapeKind::Cylinder {
            start: point(0),
            end: point(3),
            radius: numbers[6],
        },
        _ => ShapeKind::Cone {
            base: point(0),
            tip: point(3),
            radius: numbers[6],
        },
    };

    structure.shapes.push(Shape {
        kind,
        color,
        comment,
    });
    Ok(())
}

/// Splits arguments into the leading numbers and an optional trailing comment.
fn split_args(
    name: &str,
    mut args: Vec<Arg>,
    line: usize,
) -> Result<(Vec<f64>, Option<String>), ParseError> {
    let comment = match args.last() {
        Some(Arg::Str(_)) => match args.pop() {
            Some(Arg::Str(comment)) => Some(comment),
            _ => None,
        },
        _ => None,
    };

    let numbers = args
        .into_iter()
        .map(|arg| match arg {
            Arg::Number(value) => Ok(value),
            Arg::Str(_) => Err(ParseError::at_line(
                line,
                format!("{name}: only the last argument may be a comment"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((numbers, comment))
}

fn color(values: &[f64], line: usize) -> Result<Color, ParseError> {
    let component = |value: f64| -> Result<u8, ParseError> {
        if value.fract() == 0.0 && (0.0..=255.0).contains(&value) {
            Ok(value as u8)
        } else {
            Err(ParseError::at_line(
                line,
                format!("colour component {value} is not an integer in 0..=255"),
            ))
        }
    };
    let alpha = values[3];
    if !(0.0..=1.0).contains(&alpha) {
        return Err(ParseError::at_line(
            line,
            format!("opacity {alpha} is outside 0..=1"),
        ));
    }
    Ok(Color {
        r: component(values[0])?,
        g: component(values[1])?,
        b: component(values[2])?,
        a: alpha,
    })
}
