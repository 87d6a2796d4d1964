//! Compilation of boolean policies into monotone span programs.
//!
//! Grammar (`AND` binds tighter than `OR`, keywords are case-insensitive):
//!
//! ```text
//! policy := term ("OR" term)*
//! term   := factor ("AND" factor)*
//! factor := ATTRIBUTE | "(" policy ")"
//! ```
//!
//! The matrix is built with the Lewko-Waters labelling:
//! an `OR` gate passes its vector to both children, an `AND` gate with vector `v`
//! gives `v || 1` to its left child and `(0, ..., 0, -1)` to its right child,
//! each `AND` gate claiming one new column.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::access::AccessStructure;

/// The maximum nesting depth of parentheses in a policy.
pub const MAX_NESTING: usize = 32;

/// The maximum number of attribute occurrences (matrix rows) in a policy.
pub const MAX_ATTRIBUTES: usize = 256;

/// Errors that can happen when compiling a boolean policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy contains no attributes.
    Empty,
    /// A token appeared where it is not allowed.
    UnexpectedToken(String),
    /// Opening and closing parentheses do not match.
    UnbalancedParentheses,
    /// The policy ended in the middle of an expression.
    UnexpectedEnd,
    /// Parentheses are nested deeper than [`MAX_NESTING`].
    TooDeep,
    /// The policy names more than [`MAX_ATTRIBUTES`] attributes.
    TooManyAttributes,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Policy is empty"),
            Self::UnexpectedToken(token) => write!(f, "Unexpected token in policy: {}", token),
            Self::UnbalancedParentheses => write!(f, "Unbalanced parentheses in policy"),
            Self::UnexpectedEnd => write!(f, "Policy ended unexpectedly"),
            Self::TooDeep => write!(
                f,
                "Policy nests parentheses deeper than {} levels",
                MAX_NESTING
            ),
            Self::TooManyAttributes => write!(
                f,
                "Policy names more than {} attributes",
                MAX_ATTRIBUTES
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PolicyError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Attribute(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "("),
            Self::Close => write!(f, ")"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Attribute(name) => write!(f, "{}", name),
        }
    }
}

fn tokenize(policy: &str) -> Vec<Token> {
    fn flush(word: &mut String, tokens: &mut Vec<Token>) {
        if word.is_empty() {
            return;
        }
        let token = if word.eq_ignore_ascii_case("and") {
            Token::And
        } else if word.eq_ignore_ascii_case("or") {
            Token::Or
        } else {
            Token::Attribute(word.clone())
        };
        tokens.push(token);
        word.clear();
    }

    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in policy.chars() {
        match c {
            '(' | ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

enum Node {
    Leaf(String),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn policy(&mut self) -> Result<Node, PolicyError> {
        let mut node = self.term()?;
        while self.peek() == Some(&Token::Or) {
            self.position += 1;
            node = Node::Or(Box::new(node), Box::new(self.term()?));
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, PolicyError> {
        let mut node = self.factor()?;
        while self.peek() == Some(&Token::And) {
            self.position += 1;
            node = Node::And(Box::new(node), Box::new(self.factor()?));
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<Node, PolicyError> {
        match self.next() {
            Some(Token::Attribute(name)) => Ok(Node::Leaf(name)),
            Some(Token::Open) => {
                let node = self.policy()?;
                match self.next() {
                    Some(Token::Close) => Ok(node),
                    Some(token) => Err(PolicyError::UnexpectedToken(token.to_string())),
                    None => Err(PolicyError::UnbalancedParentheses),
                }
            }
            Some(Token::Close) => Err(PolicyError::UnbalancedParentheses),
            Some(token) => Err(PolicyError::UnexpectedToken(token.to_string())),
            None => Err(PolicyError::UnexpectedEnd),
        }
    }
}

/// Bounds the recursion of the parser, of the labelling, and of the tree drop.
fn check_size(tokens: &[Token]) -> Result<(), PolicyError> {
    let mut depth = 0usize;
    let mut attributes = 0usize;
    for token in tokens {
        match token {
            Token::Open => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(PolicyError::TooDeep);
                }
            }
            Token::Close => depth = depth.saturating_sub(1),
            Token::Attribute(_) => {
                attributes += 1;
                if attributes > MAX_ATTRIBUTES {
                    return Err(PolicyError::TooManyAttributes);
                }
            }
            Token::And | Token::Or => {}
        }
    }
    Ok(())
}

fn parse(policy: &str) -> Result<Node, PolicyError> {
    let tokens = tokenize(policy);
    if tokens.is_empty() {
        return Err(PolicyError::Empty);
    }
    check_size(&tokens)?;
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let node = parser.policy()?;
    match parser.next() {
        None => Ok(node),
        Some(Token::Close) => Err(PolicyError::UnbalancedParentheses),
        Some(token) => Err(PolicyError::UnexpectedToken(token.to_string())),
    }
}

fn label(node: Node, vector: Vec<i64>, columns: &mut usize, rows: &mut Vec<(Vec<i64>, String)>) {
    match node {
        Node::Leaf(attribute) => rows.push((vector, attribute)),
        Node::Or(left, right) => {
            label(*left, vector.clone(), columns, rows);
            label(*right, vector, columns, rows);
        }
        Node::And(left, right) => {
            let mut left_vector = vector;
            left_vector.resize(*columns, 0);
            left_vector.push(1);

            let mut right_vector = vec![0; *columns];
            right_vector.push(-1);

            *columns += 1;
            label(*left, left_vector, columns, rows);
            label(*right, right_vector, columns, rows);
        }
    }
}

/// Compiles a boolean policy string into an [`AccessStructure`].
///
/// Attributes may repeat in the formula; the resulting structure then
/// has several rows with the same label and is refused at encryption time.
pub fn compile(policy: &str) -> Result<AccessStructure, PolicyError> {
    let root = parse(policy)?;

    let mut columns = 1;
    let mut labelled = Vec::new();
    label(root, vec![1], &mut columns, &mut labelled);

    let (matrix, row_to_attrib): (Vec<_>, Vec<_>) = labelled
        .into_iter()
        .map(|(mut row, attribute)| {
            row.resize(columns, 0);
            (row, attribute)
        })
        .unzip();

    // Rows are padded to a common length and each carries its label.
    AccessStructure::from_signed_rows(matrix, row_to_attrib).map_err(|_| PolicyError::Empty)
}
