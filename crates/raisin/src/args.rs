//! Positional constructor arguments of an exception.
//!
//! An exception's `args` is the ordered sequence of values it was constructed with. It is
//! what the default comparator compares, and its rendering follows Python's tuple repr so
//! failure messages read the same way they would in a Python traceback:
//! `('list index out of range',)`, `(2, 'bye')`, `()`.

use std::fmt::{self, Display, Write};

use smallvec::SmallVec;

/// A single positional argument.
///
/// Covers the value shapes exceptions are usually built from. Anything richer belongs in a
/// custom exception type with its own comparator.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Python's `None`.
    None,
    /// Python boolean (`True` or `False`).
    Bool(bool),
    /// Integer (64-bit signed).
    Int(i64),
    /// Float (64-bit IEEE 754).
    Float(f64),
    /// String (UTF-8).
    Str(String),
    /// Nested tuple of arguments.
    Tuple(Vec<Self>),
}

impl Arg {
    /// Returns the argument formatted as Python would repr it.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut s = String::new();
        // writing into a String cannot fail
        let _ = self.repr_fmt(&mut s);
        s
    }

    fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => float_repr_fmt(*v, f),
            Self::Str(s) => string_repr_fmt(s, f),
            Self::Tuple(items) => tuple_repr_fmt(items, f),
        }
    }
}

/// str() of an argument: strings are written raw, everything else as its repr.
impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            _ => self.repr_fmt(f),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl From<Args> for Arg {
    fn from(value: Args) -> Self {
        Self::Tuple(value.0.into_vec())
    }
}

/// The ordered argument tuple of an exception.
///
/// Equality is element-wise and order-sensitive, which is exactly the check the default
/// comparator performs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(SmallVec<[Arg; 3]>);

impl Args {
    /// Creates an empty argument tuple.
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Creates an argument tuple from already converted arguments.
    #[must_use]
    pub fn from_vec(args: Vec<Arg>) -> Self {
        Self(SmallVec::from_vec(args))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }

    /// Appends an argument.
    pub fn push(&mut self, arg: impl Into<Arg>) {
        self.0.push(arg.into());
    }

    /// str() of an exception built from these arguments.
    ///
    /// No arguments gives an empty string, a single argument gives that argument's str(),
    /// and several arguments give the tuple repr.
    #[must_use]
    pub fn message(&self) -> String {
        match self.0.as_slice() {
            [] => String::new(),
            [single] => single.to_string(),
            _ => self.to_string(),
        }
    }

    /// Writes the arguments comma separated, without the surrounding parentheses.
    ///
    /// Used for exception reprs: `IndexError('x')` has no trailing comma, unlike the tuple.
    pub(crate) fn inner_repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(first) = iter.next() {
            first.repr_fmt(f)?;
            for item in iter {
                f.write_str(", ")?;
                item.repr_fmt(f)?;
            }
        }
        Ok(())
    }
}

/// Python tuple repr, including the trailing comma of a one-element tuple.
impl Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        tuple_repr_fmt(&self.0, f)
    }
}

impl FromIterator<Arg> for Args {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds an [`Args`] tuple, converting every element with `Arg::from`.
///
/// ```
/// use raisin::args;
///
/// assert_eq!(args![2, "bye"].to_string(), "(2, 'bye')");
/// assert_eq!(args!["only"].to_string(), "('only',)");
/// assert_eq!(args![].to_string(), "()");
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        $crate::Args::from_vec(vec![$($crate::Arg::from($arg)),*])
    };
}

fn tuple_repr_fmt(items: &[Arg], f: &mut impl Write) -> fmt::Result {
    f.write_char('(')?;
    let mut iter = items.iter();
    if let Some(first) = iter.next() {
        first.repr_fmt(f)?;
        for item in iter {
            f.write_str(", ")?;
            item.repr_fmt(f)?;
        }
    }
    if items.len() == 1 {
        f.write_char(',')?;
    }
    f.write_char(')')
}

/// Writes a float the way Python's `repr(float)` does.
///
/// `ryu` gives the shortest round-tripping digits; the notation is then adjusted to Python's.
fn float_repr_fmt(v: f64, f: &mut impl Write) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v.is_sign_negative() { "-inf" } else { "inf" });
    }
    let mut buffer = ryu::Buffer::new();
    f.write_str(&fix_ryu_exponent(buffer.format_finite(v)))
}

/// Converts ryu's notation to Python's.
///
/// Python signs the exponent and pads it to two digits (`1e20` becomes `1e+20`), switches to
/// exponent form below `1e-4` where ryu still writes `0.00001`, and always shows a decimal
/// point on positional floats.
fn fix_ryu_exponent(s: &str) -> String {
    if let Some(e_pos) = s.find('e') {
        let (mantissa, exp_part) = s.split_at(e_pos);
        let exp = &exp_part[1..];
        let (sign, digits) = exp.strip_prefix('-').map_or(('+', exp), |digits| ('-', digits));
        return format!("{mantissa}e{sign}{digits:0>2}");
    }

    let (neg, unsigned) = s.strip_prefix('-').map_or(("", s), |rest| ("-", rest));
    if let Some(fraction) = unsigned.strip_prefix("0.0000") {
        let digits = fraction.trim_start_matches('0');
        let exp = 5 + fraction.len() - digits.len();
        let mantissa = match digits.split_at(1) {
            (first, "") => first.to_owned(),
            (first, rest) => format!("{first}.{rest}"),
        };
        return format!("{neg}{mantissa}e-{exp:02}");
    }

    if s.contains('.') { s.to_owned() } else { format!("{s}.0") }
}

/// Writes `s` quoted the way Python's `repr(str)` does.
///
/// Single quotes are preferred; double quotes are used when the string contains a single
/// quote but no double quote.
pub(crate) fn string_repr_fmt(s: &str, f: &mut impl Write) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Display adapter rendering a string as its Python repr.
#[derive(Debug, Clone, Copy)]
pub struct StrRepr<'a>(pub &'a str);

impl Display for StrRepr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        string_repr_fmt(self.0, f)
    }
}
