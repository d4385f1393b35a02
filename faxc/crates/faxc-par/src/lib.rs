//! faxc-par - Parser (Syntactic Analyzer)
//!
//! ============================================================================
//! PARSING THEORY
//! ============================================================================
//!
//! Parsing is the process of analyzing a string of tokens to determine
//! its grammatical structure according to a formal grammar. The output
//! is an Abstract Syntax Tree (AST).
//!
//! FORMAL DEFINITION:
//! ------------------
//! Given:
//! - G = (N, T, P, S) where
//!   N = non-terminal symbols
//!   T = terminal symbols (tokens)
//!   P = production rules
//!   S = start symbol
//!
//! Parsing is finding a derivation S ⇒* w where w is the input token sequence.
//!
//! GRAMMAR TYPES (Chomsky Hierarchy):
//! ----------------------------------
//!
//! Type 0: Unrestricted (Turing-complete)
//! Type 1: Context-sensitive
//! Type 2: Context-free (most programming languages)
//! Type 3: Regular (tokens/lexer)
//!
//! Most programming languages use context-free grammars (CFG) with some
//! context-sensitive elements (e.g., type checking) handled later.
//!
//! GRAMMAR NOTATION:
//! -----------------
//! We use Extended Backus-Naur Form (EBNF):
//!
//! ```ebnf
//! function = "fn" identifier "(" parameters ")" [ "->" type ] block ;
//!
//! parameters = [ parameter { "," parameter } ] ;
//!
//! parameter = identifier ":" type ;
//!
//! block = "{" { statement } "}" ;
//! ```
//!
//! Symbols:
//! - "literal" = exact token match
//! - [ optional ] = zero or one
//! - { repetition } = zero or more
//! - ( grouping ) = precedence
//! - | = alternation (choice)
//!
//! ============================================================================
//! PARSING ALGORITHMS
//! ============================================================================
//!
//! ALGORITHM 1: RECURSIVE DESCENT
//! ------------------------------
//!
//! A top-down parser where each non-terminal has a corresponding function.
//!
//! Structure:
//! ```
//! parse_function() {
//!     expect(Fn);
//!     name = parse_identifier();
//!     expect(LParen);
//!     params = parse_parameters();
//!     expect(RParen);
//!     ret = optional(parse_return_type);
//!     body = parse_block();
//!     return Function { name, params, ret, body };
//! }
//! ```
//!
//! REQUIREMENTS:
//! - Grammar must not be left-recursive
//! - Predictive (no backtracking) requires LL(1) grammar
//!
//! LEFT RECURSION ELIMINATION:
//! ---------------------------
//!
//! Problem:
//! ```
//! expr := expr + term | term
//! ```
//!
//! This causes infinite recursion in recursive descent!
//!
//! Solution - Transform to right recursion:
//! ```
//! expr := term { + term }
//! ```
//!
//! Or use iteration:
//! ```
//! parse_expr() {
//!     left = parse_term();
//!     while current == Plus {
//!         consume(Plus);
//!         right = parse_term();
//!         left = Binary(left, Plus, right);
//!     }
//!     return left;
//! }
//! ```
//!
//! ALGORITHM 2: PRATT PARSING (TOP-DOWN OPERATOR PRECEDENCE)
//! ---------------------------------------------------------
//!
//! Efficient expression parsing handling precedence and associativity.
//!
//! KEY IDEA:
//! Each token has two binding powers:
//! - Left binding power (lbp): How strongly it binds to the left
//! - Right binding power (rbp): How strongly it binds to the right
//!
//! Higher binding power = tighter grouping
//!
//! PRECEDENCE TABLE (higher number = tighter binding):
//! ```
//! Token       lbp     rbp     Associativity
//! -----------------------------------------
//! =           1       2       Right
//! ||          3       4       Left
//! &&          5       6       Left
//! ==, !=      7       8       Left
//! <, >, etc.  9       10      Left
//! +, -        11      12      Left
//! *, /, %     13      14      Left
//! !, - (unary)15      -       Prefix
//!
//! Literals    0       -       Atom
//! ```
//!
//! ALGORITHM:
//! ```
//! parse_expression(min_bp) {
//!     // Parse prefix (atom or prefix operator)
//!     lhs = parse_prefix();
//!     
//!     while lbp(current) >= min_bp {
//!         op = current;
//!         advance();
//!         rhs = parse_expression(rbp(op));
//!         lhs = Binary(lhs, op, rhs);
//!     }
//!     
//!     return lhs;
//! }
//! ```
//!
//! EXAMPLE:
//! ```
//! Input: a + b * c
//!
//! parse_expression(0):
//!   lhs = parse_prefix() → "a"
//!   
//!   lbp(+) = 11 >= 0, so:
//!     op = +
//!     advance()
//!     rhs = parse_expression(12)  // rbp(+) = 12
//!       parse_prefix() → "b"
//!       lbp(*) = 13 >= 12, so:
//!         op = *
//!         advance()
//!         rhs = parse_expression(14) → "c"
//!         lhs = Binary("b", *, "c")
//!       lbp(end) = 0 < 12, stop
//!       return Binary("b", *, "c")
//!     lhs = Binary("a", +, Binary("b", *, "c"))
//!   
//!   lbp(end) = 0 < 0, stop
//!   return Binary("a", +, Binary("b", *, "c"))
//! ```
//!
//! RESULT: Correct precedence: a + (b * c)
//!
//! ALGORITHM 3: LR PARSING (BOTTOM-UP)
//! -----------------------------------
//!
//! Not used in this implementation but important to understand.
//!
//! Uses a stack and state machine (DFA) to shift tokens and reduce
//! by production rules.
//!
//! Actions:
//! - Shift: Push token onto stack
//! - Reduce: Replace top N stack items with non-terminal
//!
//! Advantages:
//! - Handles left recursion naturally
//! - More powerful than LL (can parse more grammars)
//!
//! Disadvantages:
//! - Harder to write by hand
//! - Error messages less clear
//!
//! ============================================================================
//! ABSTRACT SYNTAX TREE (AST)
//! ============================================================================
//!
//! The AST represents the syntactic structure of code as a tree.
//! It abstracts away concrete syntax (parentheses, semicolons) and
//! focuses on semantic structure.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. COMPLETENESS: Capture all semantic information
//! 2. ABSTRACTION: Remove syntactic sugar
//! 3. UNAMBIGUITY: One AST node per construct
//! 4. EXTENSIBILITY: Easy to add new node types
//!
//! AST vs CST (Concrete Syntax Tree):
//! ----------------------------------
//! CST includes all tokens (parentheses, braces, etc.).
//! AST is abstracted - only essential information.
//!
//! Example:
//! ```
//! Source: (a + b) * c
//!
//! CST:
//!   BinaryExpr
//!   ├── LParen "("
//!   ├── BinaryExpr
//!   │   ├── Ident "a"
//!   │   ├── Plus "+"
//!   │   └── Ident "b"
//!   ├── RParen ")"
//!   ├── Star "*"
//!   └── Ident "c"
//!
//! AST:
//!   BinaryExpr(*)
//!   ├── BinaryExpr(+)
//!   │   ├── Ident("a")
//!   │   └── Ident("b")
//!   └── Ident("c")
//! ```
//!
//! NODE TYPES:
//! -----------
//!
//! 1. ITEMS - Top-level declarations
//!    - Functions
//!    - Structs
//!    - Enums
//!    - Traits
//!    - Impl blocks
//!
//! 2. STATEMENTS - Executable code units
//!    - Let bindings
//!    - Expression statements
//!    - Control flow (if, while, for)
//!    - Return
//!
//! 3. EXPRESSIONS - Values and operations
//!    - Literals
//!    - Identifiers
//!    - Binary operations
//!    - Unary operations
//!    - Function calls
//!    - Field access
//!    - Block expressions
//!    - If/match expressions
//!    - Async block expressions
//!    - Await expressions
//!
//! 4. TYPES - Type expressions
//!    - Named types
//!    - Generic types
//!    - Reference types
//!    - Function types
//!    - Tuple types
//!
//! ============================================================================
//! ERROR RECOVERY
//! ============================================================================
//!
//! When parser encounters syntax error, it should:
//! 1. Report clear error message
//! 2. Recover to continue parsing
//! 3. Avoid cascading errors
//!
//! STRATEGY 1: PANIC MODE
//! ----------------------
//! Skip tokens until reaching synchronization point.
//!
//! Sync points:
//! - Statement separators (;)
//! - Block boundaries ({, })
//! - Top-level declarations
//!
//! ```
//! if x { y } else { z  // Missing }
//!
//! fn foo() { }         // Sync at 'fn'
//! ```
//!
//! STRATEGY 2: STATEMENT SKIPPING
//! ------------------------------
//! If error in statement, skip to next statement.
//!
//! STRATEGY 3: EXPECTED TOKEN INSERTION
//! ------------------------------------
//! Assume missing token exists and continue.
//!
//! ```
//! let x =           // Missing expression
//! let y = 10;
//!
//! Recovery: Insert dummy expression after '='
//! ```
//!
//! STRATEGY 4: DELIMITER MATCHING
//! ------------------------------
//! Match opening/closing delimiters intelligently.
//!
//! ```
//! { a + b           // Missing }
//!
//! Recovery: Insert } before next top-level item
//! ```
//!
//! ERROR MESSAGE QUALITY:
//! ----------------------
//! Good error messages should:
//! 1. Clearly state what was expected
//! 2. Show what was found instead
//! 3. Provide location (line, column)
//! 4. Suggest fix if obvious
//!
//! Example:
//! ```
//! error: expected `;`, found `let`
//!   --> main.fax:3:5
//!    |
//!  2 |     x = 5
//!    |          - help: consider adding `;` here
//!  3 |     let y = 10;
//!    |     ^^^ unexpected token
//! ```

// ============================================================================
// MACRO SYSTEM
// ============================================================================
//!
//! Fax supports three types of macros, similar to Rust:
//! 1. Declarative Macros (`macro_rules!`)
//! 2. Derive Macros (`#[derive(...)]`)
//! 3. Function-like Macros (`println!`, `vec![]`)
//!
//! ============================================================================
//! MACRO OVERVIEW
//! ============================================================================
//!
//! Macros provide compile-time code generation. They allow writing code
//! that writes other code, reducing boilerplate and enabling DSLs.
//!
//! KEY DIFFERENCE FROM FUNCTIONS:
//! - Functions: operate on values
//! - Macros: operate on code (tokens), expanded before compilation
//!
//! ============================================================================
//! DECLARATIVE MACROS (macro_rules!)
//! ============================================================================
//!
//! Declarative macros use pattern matching to generate code.
//!
//! SYNTAX:
//! -------
//! ```fax
//! macro_rules! macro_name {
//!     (pattern1) => { generated_code1 };
//!     (pattern2) => { generated_code2 };
//!     // ... more patterns
//! }
//! ```
//!
//! MACRO PATTERNS:
//! --------------
//! 1. LITERAL PATTERNS - Match exact tokens
//!    ```
//!    () => { ... }           // Match empty
//!    + => { ... }            // Match + operator
//!    fn => { ... }           // Match fn keyword
//!    ```
//!
//! 2. CAPTURE PATTERNS - Match and bind tokens
//!    ```
//!    $name:expr              // Match any expression, bind as "name"
//!    $name:ident             // Match any identifier
//!    $name:ty                // Match any type
//!    $name:pat              // Match any pattern
//!    $name:stmt             // Match any statement
//!    $name:block            // Match any block
//!    $name:meta             // Match any attribute/meta
//!    $name:item            // Match any item (fn, struct, etc.)
//!    $name:lifetime         // Match any lifetime
//!
//!    $name:tt               // Match any token tree
//!    $name:vis              // Match any visibility modifier
//!    ```
//!
//! 3. REPETITION PATTERNS - Match multiple tokens
//!    ```
//!    $($item:expr),*        // Zero or more, separated by comma
//!    $($item:expr)+         // One or more, separated by comma
//!    $($item:expr)?        // Optional (zero or one)
//!    $($item:expr),* $(,)? // Optional trailing comma
//!    ```
//!
//! EXAMPLE - vec![]:
//! -----------------
//! ```fax
//! macro_rules! vec {
//!     // vec![1, 2, 3]
//!     ($($item:expr),* $(,)?) => {
//!         {
//!             let mut temp_vec = ::std::Vec::new();
//!             $(
//!                 temp_vec.push($item);
//!             )*
//!             temp_vec
//!         }
//!     };
//! }
//! ```
//!
//! EXPANSION:
//! ----------
//! Given: `vec![1, 2, 3]`
//!
//! The macro expands to:
//! ```fax
//! {
//!     let mut temp_vec = ::std::Vec::new();
//!     temp_vec.push(1);
//!     temp_vec.push(2);
//!     temp_vec.push(3);
//!     temp_vec
//! }
//! ```
//!
//! EXAMPLE - map![]:
//! -----------------
//! ```fax
//! macro_rules! map {
//!     ($($key:expr => $value:expr),* $(,)?) => {{
//!         ::std::collections::HashMap::from([
//!             $(($key, $value)),*
//!         ])
//!     }};
//! }
//! ```
//!
//! Usage: `map!["a" => 1, "b" => 2]`
//!
//! EXAMPLE - html! DSL:
//! --------------------
//! ```fax
//! macro_rules! html {
//!     ($tag:ident $($attr:ident = $value:expr)*) => {{
//!         format!("<{}>", stringify!($tag))
//!     }};
//! }
//! ```
//!
//! ============================================================================
//! DERIVE MACROS
//! ============================================================================
//!
//! Derive macros generate trait implementations automatically.
//!
//! SYNTAX:
//! -------
//! ```fax
//! #[derive(Trait1, Trait2)]
//! struct MyStruct { ... }
//! ```
//!
//! BUILT-IN DERIVE TRAITS:
//! -----------------------
//!
//! 1. Clone - Generates `clone()` method
//!    ```fax
//!    #[derive(Clone)]
//!    struct Point { x: i32, y: i32 }
//!    ```
//!    Generates:
//!    ```fax
//!    impl Clone for Point {
//!        fn clone(&self) -> Point {
//!            Point { x: self.x, y: self.y }
//!        }
//!    }
//!    ```
//!
//! 2. Debug - Generates `fmt()` for debug formatting
//!    ```fax
//!    #[derive(Debug)]
//!    struct Point { x: i32, y: i32 }
//!    ```
//!    Generates:
//!    ```fax
//!    impl Debug for Point {
//!        fn fmt(&self, f: &mut Formatter) -> Result {
//!            write!(f, "Point {{ x: {}, y: {} }}", self.x, self.y)
//!        }
//!    }
//!    ```
//!
//! 3. PartialEq - Generates `==` and `!=` operators
//!    ```fax
//!    #[derive(PartialEq)]
//!    struct Point { x: i32, y: i32 }
//!    ```
//!
//! 4. Eq - Generates equality (requires PartialEq)
//!
//! 5. Default - Generates default constructor
//!    ```fax
//!    #[derive(Default)]
//!    struct Config { port: i32 = 8080 }
//!    ```
//!
//! 6. Copy - Generates bitwise copy (no heap allocation)
//!
//! ============================================================================
//! FUNCTION-LIKE MACROS
//! ============================================================================
//!
//! Macros that look like function calls but operate on tokens.
//!
//! BUILT-IN FUNCTION MACROS:
//! -------------------------
//!
//! 1. println! - Print with newline
//!    ```fax
//!    println!("Hello {}", name)
//!    println!("Number: {}", 42)
//!    println!("Multiple: {} and {}", a, b)
//!    ```
//!
//! 2. print! - Print without newline
//!    ```fax
//!    print!("Loading")
//!    print!("\rProgress: {}%", percent)
//!    ```
//!
//! 3. eprintln! - Print to stderr
//!    ```fax
//!    eprintln!("Error: {}", err)
//!    ```
//!
//! 4. format! - Create formatted string
//!    ```fax
//!    let s = format!("{} + {} = {}", a, b, a + b)
//!    ```
//!
//! 5. vec! - Create vector
//!    ```fax
//!    let v = vec![1, 2, 3]
//!    let empty: Vec<i32> = vec![]
//!    ```
//!
//! 6. assert! - Assert condition
//!    ```fax
//!    assert!(x > 0)
//!    assert!(result.is_ok(), "Error: {:?}", result)
//!    ```
//!
//! 7. assert_eq! - Assert equality
//!    ```fax
//!    assert_eq!(a, b)
//!    assert_eq!(result, expected, "custom message")
//!    ```
//!
//! 8. panic! - Panic with message
//!    ```fax
//!    panic!("Something went wrong")
//!    panic!("Expected {} but got {}", expected, got)
//!    ```
//!
//! ============================================================================
//! MACRO HYGIENE
//! ============================================================================
//!
//! Hygiene ensures macros don't accidentally capture or conflict with
//! variables from the calling context.
//!
//! THE PROBLEM:
//! ------------
//! Without hygiene, this macro would fail:
//! ```fax
//! macro_rules! double {
//!     ($x:expr) => { $x * 2 }
//! }
//!
//! fn main() {
//!     let x = 5;
//!     let result = double!(x);  // Should use the x above
//! }
//! ```
//!
//! HYGIENE SOLUTION:
//! -----------------
//! Each identifier created by a macro gets a unique "expansion context".
//! The macro's `x` is different from the caller's `x`.
//!
//! However, you can deliberately "break" hygiene using `$crate::variable`
//! or by passing identifiers that should refer to the caller's scope.
//!
//! ============================================================================
//! MACRO EXPANSION PIPELINE
//! ============================================================================
//!
//! ```
//! Source Code
//!      |
//!      v
//! +------------+
//! |   Lexer    |  Tokenize source
//! +------------+
//!      |
//!      v
//! +------------+
//! |   Parser   |  Parse tokens, recognize macro definitions
//! +------------+
//!      |
//!      v
//! +------------------+
//! | Macro Expansion |  Expand macros to generate code
//! +------------------+
//!      |  (recursive expansion until no macros left)
//!      v
//! +------------------+
//! |  Semantic (HIR) |  Continue normal compilation
//! +------------------+
//!      |
//!      v
//!     ...
//! ```
//!
//! ============================================================================
//! IMPLEMENTATION NOTES
//! ============================================================================
//!
//! 1. TOKEN TREE REPRESENTATION:
//!    - Macros work on token trees, not raw strings
//!    - TokenTree = Token | DelimitedGroup(TokenTree*)
//!    - Need to preserve parentheses, brackets, braces for grouping
//!
//! 2. MATCHING ALGORITHM:
//!    - Use recursive pattern matching
//!    - Handle repetitions with loop/recursion
//!    - Capture binding: store matched tokens per $name
//!
//! 3. EXPANSION:
//!    - Replace $name with captured tokens
//!    - Handle nested repetitions carefully
//!    - Output must be valid AST after expansion
//!
//! 4. ERROR HANDLING:
//!    - Report "no matching rule" clearly
//!    - Show which patterns were tried
//!    - Suggest corrections for common mistakes
//!
//! 5. RECURSIVE EXPANSION:
//!    - Macros can call other macros
//!    - Use worklist: keep expanding until no macros remain
//!    - Watch for infinite recursion (max expansion depth)

pub mod ast;
mod items;
mod pattern;
mod stmt;
mod types;

pub use ast::*;

use faxc_lex::{Lexer, Token};
use faxc_util::diagnostic::{DiagnosticBuilder, DiagnosticCode};
use faxc_util::{Handler, Span, Symbol};


// ============================================================================
// PARSER STRUCTURE
// ============================================================================

/// Recursive descent + Pratt parser over a flat token stream.
///
/// `items.rs`/`stmt.rs`/`types.rs`/`pattern.rs` hold the grammar-specific
/// productions; this file owns the cursor primitives, expression precedence
/// climbing, postfix chaining, and error recovery they all share.
pub struct Parser<'a> {
    /// Token stream from lexer
    tokens: Vec<Token>,

    /// Current position in token stream
    position: usize,

    /// Previous token position (for error reporting)
    prev_position: usize,

    /// Error handler
    handler: &'a mut Handler,

    /// Suppresses struct-literal parsing while parsing `if`/`while`/`for`/
    /// `match` subjects, so `if x { ... }` isn't misread as `if (x { .. }) { ... }`.
    restrict_struct_literal: bool,
}

impl<'a> Parser<'a> {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>, handler: &'a mut Handler) -> Self {
        Self {
            tokens,
            position: 0,
            prev_position: 0,
            handler,
            restrict_struct_literal: false,
        }
    }

    /// Parse a complete source file
    pub fn parse(&mut self) -> Ast {
        let mut items = Vec::new();

        while !self.is_at_end() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => self.recover_to_sync_point(),
            }
        }

        items
    }

    /// Parse expression using Pratt parser
    pub fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_expr_with_min_bp(0)
    }

    /// Parse a condition/scrutinee expression where a following `{` must
    /// open a block, not a struct literal (`if`/`while`/`for`/`match`).
    pub fn parse_expr_no_struct_literal(&mut self) -> Option<Expr> {
        let previous = self.restrict_struct_literal;
        self.restrict_struct_literal = true;
        let result = self.parse_expr();
        self.restrict_struct_literal = previous;
        result
    }

    /// Parse expression with minimum binding power (Pratt parser)
    fn parse_expr_with_min_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let prefix = self.parse_prefix()?;
        let mut lhs = self.parse_postfix(prefix)?;

        loop {
            let (lbp, rbp) = match self.infix_binding_power() {
                Some(bp) if bp.0 >= min_bp => bp,
                _ => break,
            };

            let op = self.current_token();
            self.advance();

            let rhs = self.parse_expr_with_min_bp(rbp)?;
            lhs = Expr::Binary(BinaryExpr {
                left: Box::new(lhs),
                op: self.token_to_binop(op)?,
                right: Box::new(rhs),
                span: Span::DUMMY,
            });
        }

        Some(lhs)
    }

    /// Parse prefix expression (atom or prefix operator)
    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.current_token() {
            // Prefix operators
            Token::Minus => self.parse_unary(UnOp::Neg),
            Token::Not | Token::Bang => self.parse_unary(UnOp::Not),
            Token::Tilde => self.parse_unary(UnOp::BitNot),
            Token::Star => self.parse_unary(UnOp::Deref),
            Token::Ampersand => self.parse_reference(),

            // Atoms
            Token::Number(n) => {
                self.advance();
                Some(Expr::Literal(Literal::Int(n as i64)))
            }
            Token::Float(f) => {
                self.advance();
                Some(Expr::Literal(Literal::Float(f)))
            }
            Token::String(s) => {
                self.advance();
                Some(Expr::Literal(Literal::String(s)))
            }
            Token::Char(c) => {
                self.advance();
                Some(Expr::Literal(Literal::Char(c)))
            }
            Token::True => {
                self.advance();
                Some(Expr::Literal(Literal::Bool(true)))
            }
            Token::False => {
                self.advance();
                Some(Expr::Literal(Literal::Bool(false)))
            }
            Token::Ident(_) | Token::Self_ | Token::SelfUpper | Token::Super | Token::Crate => {
                self.parse_path_or_call()
            }
            Token::LParen => self.parse_paren_or_tuple(),
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_block_expr(),
            Token::If => self.parse_if_expr(),
            Token::Match => self.parse_match_expr(),
            Token::Loop => self.parse_loop_expr(),
            Token::While => self.parse_while_expr(),
            Token::Async => self.parse_async_expr(),

            _ => {
                self.error("expected expression");
                None
            }
        }
    }

    /// Parse `op operand`, where the operand is itself fully prefix- and
    /// postfix-resolved (so `-x.field` is `-(x.field)`, not `(-x).field`).
    fn parse_unary(&mut self, op: UnOp) -> Option<Expr> {
        let span_start = self.current_span();
        self.advance();
        let operand = self.parse_prefix()?;
        let operand = self.parse_postfix(operand)?;
        let span = self.span_from_start(span_start);
        Some(Expr::Unary(UnaryExpr {
            op,
            expr: Box::new(operand),
            span,
        }))
    }

    /// Parse reference expression (`&expr` or `&mut expr`)
    fn parse_reference(&mut self) -> Option<Expr> {
        let span_start = self.current_span();
        self.expect(Token::Ampersand)?;
        let mutable = self.match_token(Token::Mut);
        let operand = self.parse_prefix()?;
        let operand = self.parse_postfix(operand)?;
        let span = self.span_from_start(span_start);
        Some(Expr::Unary(UnaryExpr {
            op: UnOp::Ref(mutable),
            expr: Box::new(operand),
            span,
        }))
    }

    /// Parse a bare path, a call, or a struct/enum-variant literal, all of
    /// which start with an identifier-like atom.
    ///
    /// A path with two or more segments ending in `(args)`/`{ fields }` is
    /// read as enum-variant construction (`Color::Rgb(r, g, b)`); a
    /// single-segment path with the same suffixes is a call or struct
    /// literal.
    fn parse_path_or_call(&mut self) -> Option<Expr> {
        let path = self.parse_path();
        if path.segments.is_empty() {
            self.error("expected identifier");
            return None;
        }

        if self.match_token(Token::LParen) {
            let args = self.parse_call_args()?;
            if path.segments.len() >= 2 {
                let (enum_path, variant, generics) = split_variant_path(path);
                return Some(Expr::EnumVariant(Box::new(EnumVariantExpr {
                    path: enum_path,
                    variant,
                    generics,
                    data: EnumVariantData::Tuple(args),
                })));
            }
            return Some(Expr::Call(CallExpr {
                func: Box::new(Expr::Path(path)),
                args,
                span: Span::DUMMY,
                generics: None,
            }));
        }

        if !self.restrict_struct_literal && self.current_token() == Token::LBrace {
            return self.parse_struct_or_enum_literal(path);
        }

        Some(Expr::Path(path))
    }

    /// Parse a parenthesized call-argument list up to (not including) the
    /// already-expected `(`, stopping at `)`.
    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        if self.current_token() != Token::RParen {
            loop {
                args.push(self.parse_expr()?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Some(args)
    }

    /// Parse `Path { field: expr, .., ..base }`, producing a struct literal
    /// for a one-segment path or an enum-variant struct literal otherwise.
    fn parse_struct_or_enum_literal(&mut self, path: Path) -> Option<Expr> {
        self.expect(Token::LBrace)?;

        let mut fields = Vec::new();
        let mut base = None;

        while !self.is_at_end() && self.current_token() != Token::RBrace {
            if self.match_token(Token::DotDot) {
                base = self.parse_expr();
                break;
            }

            let name = self.parse_ident()?;
            let (expr, is_shorthand) = if self.match_token(Token::Colon) {
                (self.parse_expr()?, false)
            } else {
                (
                    Expr::Path(Path {
                        segments: vec![PathSegment {
                            ident: name,
                            args: None,
                        }],
                    }),
                    true,
                )
            };
            fields.push(StructField {
                name,
                expr,
                is_shorthand,
            });

            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(Token::RBrace)?;

        if path.segments.len() >= 2 {
            let (enum_path, variant, generics) = split_variant_path(path);
            Some(Expr::EnumVariant(Box::new(EnumVariantExpr {
                path: enum_path,
                variant,
                generics,
                data: EnumVariantData::Struct(fields),
            })))
        } else {
            Some(Expr::StructLiteral(Box::new(StructLiteralExpr {
                path,
                generics: None,
                fields,
                base,
            })))
        }
    }

    /// Parse parenthesized expression, unit `()`, or tuple `(a, b)`
    fn parse_paren_or_tuple(&mut self) -> Option<Expr> {
        self.expect(Token::LParen)?;

        if self.match_token(Token::RParen) {
            return Some(Expr::Literal(Literal::Unit));
        }

        let mut exprs = vec![self.parse_expr()?];
        let mut is_tuple = false;
        while self.match_token(Token::Comma) {
            if self.current_token() == Token::RParen {
                break;
            }
            is_tuple = true;
            exprs.push(self.parse_expr()?);
        }
        self.expect(Token::RParen)?;

        if is_tuple {
            Some(Expr::Tuple(exprs))
        } else {
            exprs.into_iter().next()
        }
    }

    /// Parse `[a, b, c]`
    fn parse_array_literal(&mut self) -> Option<Expr> {
        self.expect(Token::LBracket)?;

        let mut elements = Vec::new();
        while !self.is_at_end() && self.current_token() != Token::RBracket {
            elements.push(self.parse_expr()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket)?;

        Some(Expr::Array(elements))
    }

    /// Parse block expression
    fn parse_block_expr(&mut self) -> Option<Expr> {
        let block = self.parse_block()?;
        Some(Expr::Block(block))
    }

    /// Apply postfix operators (field access, tuple indexing, array
    /// indexing, method calls, and `as` casts) to an already-parsed
    /// expression, left-to-right, until none remain. Binds tighter than any
    /// infix operator, including the `as` it itself handles — casts are
    /// absorbed here rather than through `infix_binding_power` so `a + b as
    /// T` parses as `a + (b as T)`.
    fn parse_postfix(&mut self, mut expr: Expr) -> Option<Expr> {
        loop {
            match self.current_token() {
                Token::Dot => {
                    self.advance();
                    expr = self.parse_field_or_method_call(expr)?;
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(IndexExpr {
                        object: Box::new(expr),
                        index: Box::new(index),
                    });
                }
                Token::As => {
                    self.advance();
                    let ty = self.parse_type()?;
                    expr = Expr::Cast(Box::new(expr), ty);
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// Parse the part after `.` in a postfix chain: a tuple index (`.0`), a
    /// field access (`.name`), or a method call (`.name::<T>(args)`).
    fn parse_field_or_method_call(&mut self, object: Expr) -> Option<Expr> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                Some(Expr::Field(FieldExpr {
                    object: Box::new(object),
                    field: Symbol::intern(&n.to_string()),
                    span: Span::DUMMY,
                }))
            }
            Token::Ident(name) => {
                self.advance();

                let generics =
                    if self.current_token() == Token::ColonColon && self.peek_token() == Token::Lt {
                        self.advance();
                        self.advance();
                        let mut args = Vec::new();
                        while !self.is_at_end() && self.current_token() != Token::Gt {
                            if let Some(ty) = self.parse_type() {
                                args.push(ty);
                            }
                            if !self.match_token(Token::Comma) {
                                break;
                            }
                        }
                        self.expect(Token::Gt)?;
                        Some(args)
                    } else {
                        None
                    };

                if self.match_token(Token::LParen) {
                    let call_args = self.parse_call_args()?;
                    Some(Expr::MethodCall(MethodCallExpr {
                        receiver: Box::new(object),
                        method: name,
                        args: generics,
                        call_args,
                    }))
                } else {
                    Some(Expr::Field(FieldExpr {
                        object: Box::new(object),
                        field: name,
                        span: Span::DUMMY,
                    }))
                }
            }
            _ => {
                self.error("expected field name or method call after '.'");
                None
            }
        }
    }

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Look at the token after the current one, without consuming it.
    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Check if at end of tokens
    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Advance to next token
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.prev_position = self.position;
            self.position += 1;
        }
    }

    /// Expect specific token
    fn expect(&mut self, expected: Token) -> Option<()> {
        if self.current_token() == expected {
            self.advance();
            Some(())
        } else {
            self.error(format!("expected {:?}, found {:?}", expected, self.current_token()));
            None
        }
    }

    /// Match and consume token
    fn match_token(&mut self, expected: Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// A position marker for span tracking. The token stream the parser
    /// receives carries no byte offsets (see `Parser::new`), so spans are
    /// measured in token indices rather than source bytes.
    fn current_span(&self) -> usize {
        self.position
    }

    fn span_from_start(&self, start: usize) -> Span {
        Span::new(start, self.position, 0, 0)
    }

    /// Get infix operator binding power. Ordered to match `expr::bp`'s
    /// precedence table: logical or/and, comparison, bitwise or/xor/and,
    /// shift, additive, multiplicative (casts are handled in `parse_postfix`,
    /// binding tighter than all of these).
    fn infix_binding_power(&self) -> Option<(u8, u8)> {
        match self.current_token() {
            Token::OrOr => Some((3, 4)),
            Token::AndAnd => Some((5, 6)),
            Token::EqEq | Token::NotEq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => {
                Some((7, 8))
            }
            Token::Pipe => Some((9, 10)),
            Token::Caret => Some((11, 12)),
            Token::Ampersand => Some((13, 14)),
            Token::Shl | Token::Shr => Some((15, 16)),
            Token::Plus | Token::Minus => Some((17, 18)),
            Token::Star | Token::Slash | Token::Percent => Some((19, 20)),
            _ => None,
        }
    }

    /// Convert token to binary operator
    fn token_to_binop(&self, token: Token) -> Option<BinOp> {
        match token {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Percent => Some(BinOp::Mod),
            Token::EqEq => Some(BinOp::Eq),
            Token::NotEq => Some(BinOp::Ne),
            Token::Lt => Some(BinOp::Lt),
            Token::Gt => Some(BinOp::Gt),
            Token::LtEq => Some(BinOp::Le),
            Token::GtEq => Some(BinOp::Ge),
            Token::AndAnd => Some(BinOp::And),
            Token::OrOr => Some(BinOp::Or),
            Token::Ampersand => Some(BinOp::BitAnd),
            Token::Pipe => Some(BinOp::BitOr),
            Token::Caret => Some(BinOp::BitXor),
            Token::Shl => Some(BinOp::Shl),
            Token::Shr => Some(BinOp::Shr),
            _ => None,
        }
    }

    /// Report error at the current token's position
    fn error(&mut self, message: impl Into<String>) {
        let span = self.span_from_start(self.current_span());
        let diag = DiagnosticBuilder::error(message)
            .code(DiagnosticCode::E_PARSER_UNEXPECTED_TOKEN)
            .span(span)
            .build();
        self.handler.emit_diagnostic(diag);
    }

    /// Skip tokens until the start of what looks like the next item, or a
    /// dangling `;`, so one bad top-level item doesn't abort the whole file.
    fn recover_to_sync_point(&mut self) {
        while !self.is_at_end() {
            match self.current_token() {
                Token::Fn
                | Token::Struct
                | Token::Enum
                | Token::Trait
                | Token::Impl
                | Token::Use
                | Token::Mod
                | Token::Const
                | Token::Static
                | Token::Pub => return,
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    /// Skip tokens until the end of the current (malformed) statement, a
    /// block boundary, or the start of the next statement/item — used
    /// inside block and trait/impl bodies where `recover_to_sync_point`'s
    /// item-only sync points would skip too much.
    fn recover_to_stmt_sync(&mut self) {
        while !self.is_at_end() {
            match self.current_token() {
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::RBrace => return,
                Token::Let
                | Token::If
                | Token::While
                | Token::For
                | Token::Return
                | Token::Fn
                | Token::Struct
                | Token::Enum
                | Token::Trait
                | Token::Impl => return,
                _ => self.advance(),
            }
        }
    }
}

/// Split a `>=2`-segment path into the enum's path (all but the last
/// segment) and the variant name/generics (the last segment), for enum
/// variant construction (`Color::Rgb(..)`/`Color::Rgb { .. }`).
fn split_variant_path(mut path: Path) -> (Path, Symbol, Option<Vec<Type>>) {
    let variant_seg = path.segments.pop().expect("path has >= 2 segments");
    (path, variant_seg.ident, variant_seg.args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_source(source: &str) -> (Ast, bool) {
        let mut handler = Handler::new();
        let tokens: Vec<Token> = Lexer::new(source, &mut handler).collect();
        let ast = Parser::new(tokens, &mut handler).parse();
        (ast, handler.has_errors())
    }

    fn parse_fn_body_expr(source: &str) -> Expr {
        let fn_source = format!("fn f() {{ {} }}", source);
        let (ast, has_errors) = parse_source(&fn_source);
        assert!(!has_errors, "unexpected parse errors for `{}`", source);
        let Item::Fn(f) = ast.into_iter().next().expect("one item") else {
            panic!("expected fn item");
        };
        *f.body.trailing.expect("trailing expr")
    }

    #[test]
    fn parses_empty_function() {
        let (ast, has_errors) = parse_source("fn main() {}");
        assert!(!has_errors);
        assert_eq!(ast.len(), 1);
        assert!(matches!(ast[0], Item::Fn(_)));
    }

    #[test]
    fn precedence_additive_vs_multiplicative() {
        let expr = parse_fn_body_expr("1 + 2 * 3");
        match expr {
            Expr::Binary(b) => {
                assert_eq!(b.op, BinOp::Add);
                assert!(matches!(*b.right, Expr::Binary(ref rb) if rb.op == BinOp::Mul));
            }
            _ => panic!("expected binary expr"),
        }
    }

    #[test]
    fn cast_binds_tighter_than_multiplicative() {
        // `a * b as i32` should be `a * (b as i32)`.
        let expr = parse_fn_body_expr("a * b as i32");
        match expr {
            Expr::Binary(b) => {
                assert_eq!(b.op, BinOp::Mul);
                assert!(matches!(*b.right, Expr::Cast(_, _)));
            }
            _ => panic!("expected binary expr"),
        }
    }

    #[test]
    fn field_then_method_call_chains() {
        let expr = parse_fn_body_expr("a.b.c()");
        match expr {
            Expr::MethodCall(m) => {
                assert_eq!(m.method.as_str(), "c");
                assert!(matches!(*m.receiver, Expr::Field(_)));
            }
            _ => panic!("expected method call"),
        }
    }

    #[test]
    fn struct_literal_parses() {
        let expr = parse_fn_body_expr("Point { x: 1, y: 2 }");
        match expr {
            Expr::StructLiteral(s) => assert_eq!(s.fields.len(), 2),
            _ => panic!("expected struct literal"),
        }
    }

    #[test]
    fn struct_literal_suppressed_in_if_condition() {
        let (ast, has_errors) = parse_source("fn f() { if a { 1 } else { 2 } }");
        assert!(!has_errors);
        assert_eq!(ast.len(), 1);
    }

    #[test]
    fn enum_tuple_variant_construction() {
        let expr = parse_fn_body_expr("Color::Rgb(1, 2, 3)");
        match expr {
            Expr::EnumVariant(v) => {
                assert_eq!(v.variant.as_str(), "Rgb");
                assert!(matches!(v.data, EnumVariantData::Tuple(ref args) if args.len() == 3));
            }
            _ => panic!("expected enum variant"),
        }
    }

    #[test]
    fn array_index_and_literal() {
        let expr = parse_fn_body_expr("[1, 2, 3][0]");
        assert!(matches!(expr, Expr::Index(_)));
    }

    #[test]
    fn loop_with_break_value_parses_as_expression() {
        let (ast, has_errors) = parse_source("fn f() -> i32 { let v = loop { break 42; }; v }");
        assert!(!has_errors);
        let Item::Fn(f) = ast.into_iter().next().unwrap() else {
            panic!("expected fn item");
        };
        let Stmt::Let(let_stmt) = &f.body.stmts[0] else {
            panic!("expected let statement");
        };
        assert!(matches!(let_stmt.init, Some(Expr::Loop(_))));
    }

    #[test]
    fn unexpected_token_reports_error_without_panicking() {
        let (_ast, has_errors) = parse_source("fn f() { + }");
        assert!(has_errors);
    }
}
