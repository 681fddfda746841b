// Copyright 2025 the Scanfill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parsing and serializing SVG path syntax.

use crate::path::{Path, PathCommand};
use crate::Error;
use core::fmt;
use core::str::FromStr;
use peniko::kurbo::{Point, Vec2};

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        parse_path(s)
    }
}

pub(crate) fn parse_path(text: &str) -> Result<Path, Error> {
    let mut lexer = Lexer {
        bytes: text.as_bytes(),
        pos: 0,
    };
    let mut path = Path::new();

    lexer.skip_separators();
    while !lexer.done() {
        let pos = lexer.pos;
        let mut letter = lexer.bytes[lexer.pos];
        if !letter.is_ascii_alphabetic() {
            return Err(Error::Parse {
                pos,
                reason: "expected a command letter",
            });
        }
        lexer.pos += 1;

        loop {
            parse_batch(&mut path, &mut lexer, letter, pos)?;
            if letter == b'Z' || letter == b'z' {
                break;
            }

            // Further parameter batches continue the same command; after a
            // move they continue as lines.
            lexer.skip_separators();
            if !lexer.at_number_start() {
                break;
            }
            letter = match letter {
                b'M' => b'L',
                b'm' => b'l',
                other => other,
            };
        }
        lexer.skip_separators();
    }

    Ok(path)
}

fn parse_batch(path: &mut Path, lexer: &mut Lexer<'_>, letter: u8, pos: usize) -> Result<(), Error> {
    let command = match letter {
        b'M' => PathCommand::MoveTo(lexer.point()?),
        b'm' => PathCommand::RelMoveTo(lexer.vec2()?),
        b'L' => PathCommand::LineTo(lexer.point()?),
        b'l' => PathCommand::RelLineTo(lexer.vec2()?),
        b'H' => PathCommand::HorizTo(lexer.number()?),
        b'h' => PathCommand::RelHorizTo(lexer.number()?),
        b'V' => PathCommand::VertTo(lexer.number()?),
        b'v' => PathCommand::RelVertTo(lexer.number()?),
        b'C' => PathCommand::CubicTo(lexer.point()?, lexer.point()?, lexer.point()?),
        b'c' => PathCommand::RelCubicTo(lexer.vec2()?, lexer.vec2()?, lexer.vec2()?),
        b'S' => PathCommand::SmoothCubicTo(lexer.point()?, lexer.point()?),
        b's' => PathCommand::RelSmoothCubicTo(lexer.vec2()?, lexer.vec2()?),
        b'Q' => PathCommand::QuadTo(lexer.point()?, lexer.point()?),
        b'q' => PathCommand::RelQuadTo(lexer.vec2()?, lexer.vec2()?),
        b'T' => PathCommand::SmoothQuadTo(lexer.point()?),
        b't' => PathCommand::RelSmoothQuadTo(lexer.vec2()?),
        b'A' => {
            let radii = lexer.vec2()?;
            let x_rotation = lexer.number()?;
            let large_arc = lexer.flag()?;
            let sweep = lexer.flag()?;
            PathCommand::ArcTo {
                radii,
                x_rotation,
                large_arc,
                sweep,
                to: lexer.point()?,
            }
        }
        b'a' => {
            let radii = lexer.vec2()?;
            let x_rotation = lexer.number()?;
            let large_arc = lexer.flag()?;
            let sweep = lexer.flag()?;
            PathCommand::RelArcTo {
                radii,
                x_rotation,
                large_arc,
                sweep,
                to: lexer.vec2()?,
            }
        }
        b'Z' | b'z' => PathCommand::Close,
        _ => {
            return Err(Error::Parse {
                pos,
                reason: "unknown command letter",
            });
        }
    };
    path.push(command);
    Ok(())
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn at_number_start(&self) -> bool {
        matches!(
            self.bytes.get(self.pos),
            Some(b'0'..=b'9' | b'.' | b'+' | b'-')
        )
    }

    /// Lex one number.
    ///
    /// A sign not preceded by `e`/`E` ends the previous number, and a leading
    /// `0` directly followed by another digit is already a complete number.
    fn number(&mut self) -> Result<f64, Error> {
        self.skip_separators();
        let start = self.pos;

        if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
            self.pos += 1;
        }

        if self.bytes.get(self.pos) == Some(&b'0')
            && matches!(self.bytes.get(self.pos + 1), Some(b'0'..=b'9'))
        {
            self.pos += 1;
        } else {
            while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            if self.bytes.get(self.pos) == Some(&b'.') {
                self.pos += 1;
                while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
            if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
                self.pos += 1;
                if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
                    self.pos += 1;
                }
                while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
        }

        let text = core::str::from_utf8(&self.bytes[start..self.pos]).map_err(|_| Error::Parse {
            pos: start,
            reason: "invalid numeric token",
        })?;
        text.parse::<f64>().map_err(|_| Error::Parse {
            pos: start,
            reason: "invalid numeric token",
        })
    }

    /// Lex an arc flag, which is always a single `0` or `1` digit.
    fn flag(&mut self) -> Result<bool, Error> {
        self.skip_separators();
        match self.bytes.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(Error::Parse {
                pos: self.pos,
                reason: "expected an arc flag",
            }),
        }
    }

    fn point(&mut self) -> Result<Point, Error> {
        Ok(Point::new(self.number()?, self.number()?))
    }

    fn vec2(&mut self) -> Result<Vec2, Error> {
        Ok(Vec2::new(self.number()?, self.number()?))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PathCommand::*;
        for (i, command) in self.commands().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match command {
                MoveTo(p) => write!(f, "M{} {}", p.x, p.y)?,
                RelMoveTo(v) => write!(f, "m{} {}", v.x, v.y)?,
                LineTo(p) => write!(f, "L{} {}", p.x, p.y)?,
                RelLineTo(v) => write!(f, "l{} {}", v.x, v.y)?,
                HorizTo(x) => write!(f, "H{x}")?,
                RelHorizTo(dx) => write!(f, "h{dx}")?,
                VertTo(y) => write!(f, "V{y}")?,
                RelVertTo(dy) => write!(f, "v{dy}")?,
                CubicTo(c1, c2, p) => {
                    write!(f, "C{} {} {} {} {} {}", c1.x, c1.y, c2.x, c2.y, p.x, p.y)?;
                }
                RelCubicTo(v1, v2, v) => {
                    write!(f, "c{} {} {} {} {} {}", v1.x, v1.y, v2.x, v2.y, v.x, v.y)?;
                }
                SmoothCubicTo(c2, p) => write!(f, "S{} {} {} {}", c2.x, c2.y, p.x, p.y)?,
                RelSmoothCubicTo(v2, v) => write!(f, "s{} {} {} {}", v2.x, v2.y, v.x, v.y)?,
                QuadTo(c, p) => write!(f, "Q{} {} {} {}", c.x, c.y, p.x, p.y)?,
                RelQuadTo(vc, v) => write!(f, "q{} {} {} {}", vc.x, vc.y, v.x, v.y)?,
                SmoothQuadTo(p) => write!(f, "T{} {}", p.x, p.y)?,
                RelSmoothQuadTo(v) => write!(f, "t{} {}", v.x, v.y)?,
                ArcTo {
                    radii,
                    x_rotation,
                    large_arc,
                    sweep,
                    to,
                } => {
                    write!(
                        f,
                        "A{} {} {} {} {} {} {}",
                        radii.x,
                        radii.y,
                        x_rotation,
                        u8::from(*large_arc),
                        u8::from(*sweep),
                        to.x,
                        to.y
                    )?;
                }
                RelArcTo {
                    radii,
                    x_rotation,
                    large_arc,
                    sweep,
                    to,
                } => {
                    write!(
                        f,
                        "a{} {} {} {} {} {} {}",
                        radii.x,
                        radii.y,
                        x_rotation,
                        u8::from(*large_arc),
                        u8::from(*sweep),
                        to.x,
                        to.y
                    )?;
                }
                Close => write!(f, "Z")?,
            }
        }
        Ok(())
    }
}
