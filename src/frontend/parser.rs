//! Recursive-descent parser and direct-to-IR code generator for the demo
//! front end. There is no separate AST-walking codegen pass: statements are
//! lowered into [`Program`] instructions as they are parsed, the way a
//! single-pass teaching compiler would.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, CompileResult};
use crate::frontend::ast::{BinOp, Cond, Expr, Item, Rel, Stmt};
use crate::frontend::lexer::{Spanned, Token};
use crate::ir::{InstrArg, Instruction, LabelHandle, Opcode, Program, RegId, REG_ZERO};

struct Parser<'a> {
    path: &'a Path,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn column(&self) -> u32 {
        self.tokens[self.pos].column
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            path: self.path.to_path_buf(),
            line: self.line(),
            column: self.column(),
            message: message.into(),
        }
    }

    fn expect_sym(&mut self, sym: &'static str) -> CompileResult<()> {
        match self.peek() {
            Token::Sym(s) if *s == sym => {
                self.advance();
                Ok(())
            }
            _ => Err(self.err(format!("expected '{sym}'"))),
        }
    }

    fn expect_kw(&mut self, kw: &'static str) -> CompileResult<()> {
        match self.peek() {
            Token::Kw(k) if *k == kw => {
                self.advance();
                Ok(())
            }
            _ => Err(self.err(format!("expected '{kw}'"))),
        }
    }

    fn ident(&mut self) -> CompileResult<String> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.err("expected an identifier")),
        }
    }

    fn at_sym(&self, sym: &str) -> bool {
        matches!(self.peek(), Token::Sym(s) if *s == sym)
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Kw(k) if *k == kw)
    }

    fn parse_program(&mut self) -> CompileResult<Vec<Item>> {
        let mut items = Vec::new();
        while !matches!(self.peek(), Token::Eof) {
            if self.at_kw("int") {
                items.push(Item::Decl(self.parse_decl()?));
            } else {
                items.push(Item::Stmt(self.parse_stmt()?));
            }
        }
        Ok(items)
    }

    fn parse_decl(&mut self) -> CompileResult<String> {
        self.expect_kw("int")?;
        let name = self.ident()?;
        self.expect_sym(";")?;
        Ok(name)
    }

    fn parse_block(&mut self) -> CompileResult<Vec<Stmt>> {
        self.expect_sym("{")?;
        let mut stmts = Vec::new();
        while !self.at_sym("}") {
            stmts.push(self.parse_stmt()?);
        }
        self.expect_sym("}")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        if self.at_kw("read") {
            self.advance();
            self.expect_sym("(")?;
            let name = self.ident()?;
            self.expect_sym(")")?;
            self.expect_sym(";")?;
            return Ok(Stmt::Read(name));
        }
        if self.at_kw("print") {
            self.advance();
            self.expect_sym("(")?;
            let e = self.parse_expr()?;
            self.expect_sym(")")?;
            self.expect_sym(";")?;
            return Ok(Stmt::Print(e));
        }
        if self.at_kw("while") {
            self.advance();
            self.expect_sym("(")?;
            let cond = self.parse_cond()?;
            self.expect_sym(")")?;
            let body = self.parse_block()?;
            return Ok(Stmt::While(cond, body));
        }
        if self.at_kw("if") {
            self.advance();
            self.expect_sym("(")?;
            let cond = self.parse_cond()?;
            self.expect_sym(")")?;
            let then_body = self.parse_block()?;
            let else_body = if self.at_kw("else") {
                self.advance();
                self.parse_block()?
            } else {
                Vec::new()
            };
            return Ok(Stmt::If(cond, then_body, else_body));
        }
        let name = self.ident()?;
        self.expect_sym("=")?;
        let e = self.parse_expr()?;
        self.expect_sym(";")?;
        Ok(Stmt::Assign(name, e))
    }

    fn parse_cond(&mut self) -> CompileResult<Cond> {
        let lhs = self.parse_expr()?;
        let rel_sym = match self.peek().clone() {
            Token::Sym(s) => s,
            _ => return Err(self.err("expected a comparison operator")),
        };
        let (rel, swap) = match rel_sym {
            "==" => (Rel::Eq, false),
            "!=" => (Rel::Ne, false),
            "<" => (Rel::Lt, false),
            ">=" => (Rel::Ge, false),
            ">" => (Rel::Lt, true),
            "<=" => (Rel::Ge, true),
            _ => return Err(self.err("expected a comparison operator")),
        };
        self.advance();
        let rhs = self.parse_expr()?;
        Ok(if swap {
            Cond {
                lhs: rhs,
                rel,
                rhs: lhs,
            }
        } else {
            Cond { lhs, rel, rhs }
        })
    }

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Token::Sym("+") => BinOp::Add,
                Token::Sym("-") => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> CompileResult<Expr> {
        match self.peek().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Num(n))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Var(name))
            }
            Token::Sym("(") => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect_sym(")")?;
                Ok(e)
            }
            _ => Err(self.err("expected a number, identifier or '('")),
        }
    }
}

pub fn parse(path: &Path, tokens: Vec<Spanned>) -> CompileResult<Vec<Item>> {
    let mut parser = Parser {
        path,
        tokens,
        pos: 0,
    };
    parser.parse_program()
}

fn branch_opcode(rel: Rel, negate: bool) -> Opcode {
    use Rel::*;
    match (rel, negate) {
        (Eq, false) => Opcode::Beq,
        (Eq, true) => Opcode::Bne,
        (Ne, false) => Opcode::Bne,
        (Ne, true) => Opcode::Beq,
        (Lt, false) => Opcode::Blt,
        (Lt, true) => Opcode::Bge,
        (Ge, false) => Opcode::Bge,
        (Ge, true) => Opcode::Blt,
        (Ltu, false) => Opcode::Bltu,
        (Ltu, true) => Opcode::Bgeu,
        (Geu, false) => Opcode::Bgeu,
        (Geu, true) => Opcode::Bltu,
    }
}

/// Single-pass code generator: walks parsed [`Item`]s and emits directly
/// into a borrowed [`Program`].
pub struct Codegen<'p> {
    program: &'p mut Program,
    vars: HashMap<String, RegId>,
    line: u32,
    path: PathBuf,
}

impl<'p> Codegen<'p> {
    pub fn new(program: &'p mut Program, path: &Path) -> Self {
        Codegen {
            program,
            vars: HashMap::new(),
            line: 0,
            path: path.to_path_buf(),
        }
    }

    pub fn last_line(&self) -> u32 {
        self.line
    }

    pub fn emit_item(&mut self, item: &Item) -> CompileResult<()> {
        match item {
            Item::Decl(name) => {
                self.emit_decl(name);
                Ok(())
            }
            Item::Stmt(s) => self.emit_stmt(s),
        }
    }

    fn next_line(&mut self) -> u32 {
        self.line += 1;
        self.line
    }

    fn emit_decl(&mut self, name: &str) {
        let reg = self.program.new_register();
        let line = self.next_line();
        self.program.add_instruction(
            Instruction::new(Opcode::AddI)
                .with_dest(InstrArg::new(reg))
                .with_src1(InstrArg::new(REG_ZERO))
                .with_immediate(0),
            line,
        );
        self.vars.insert(name.to_string(), reg);
    }

    fn var_reg(&self, name: &str) -> CompileResult<RegId> {
        self.vars.get(name).copied().ok_or_else(|| CompileError::Semantic {
            path: self.path.clone(),
            line: self.line,
            message: format!("undeclared variable `{name}`"),
        })
    }

    fn emit_expr_into(&mut self, e: &Expr, dest: RegId) -> CompileResult<()> {
        match e {
            Expr::Num(n) => {
                let line = self.next_line();
                self.program.add_instruction(
                    Instruction::new(Opcode::AddI)
                        .with_dest(InstrArg::new(dest))
                        .with_src1(InstrArg::new(REG_ZERO))
                        .with_immediate(*n),
                    line,
                );
            }
            Expr::Var(name) => {
                let src = self.var_reg(name)?;
                if src != dest {
                    let line = self.next_line();
                    self.program.add_instruction(
                        Instruction::new(Opcode::AddI)
                            .with_dest(InstrArg::new(dest))
                            .with_src1(InstrArg::new(src))
                            .with_immediate(0),
                        line,
                    );
                }
            }
            Expr::Bin(op, l, r) => {
                let lreg = self.program.new_register();
                self.emit_expr_into(l, lreg)?;
                let rreg = self.program.new_register();
                self.emit_expr_into(r, rreg)?;
                let opcode = match op {
                    BinOp::Add => Opcode::Add,
                    BinOp::Sub => Opcode::Sub,
                };
                let line = self.next_line();
                self.program.add_instruction(
                    Instruction::new(opcode)
                        .with_dest(InstrArg::new(dest))
                        .with_src1(InstrArg::new(lreg))
                        .with_src2(InstrArg::new(rreg)),
                    line,
                );
            }
        }
        Ok(())
    }

    fn emit_cond_branch(&mut self, cond: &Cond, negate: bool, target: LabelHandle) -> CompileResult<()> {
        let lreg = self.program.new_register();
        self.emit_expr_into(&cond.lhs, lreg)?;
        let rreg = self.program.new_register();
        self.emit_expr_into(&cond.rhs, rreg)?;
        let opcode = branch_opcode(cond.rel, negate);
        let line = self.next_line();
        self.program.add_instruction(
            Instruction::new(opcode)
                .with_src1(InstrArg::new(lreg))
                .with_src2(InstrArg::new(rreg))
                .with_address_label(target),
            line,
        );
        Ok(())
    }

    fn emit_stmt(&mut self, s: &Stmt) -> CompileResult<()> {
        match s {
            Stmt::Assign(name, e) => {
                let dest = self.var_reg(name)?;
                self.emit_expr_into(e, dest)
            }
            Stmt::Read(name) => {
                let dest = self.var_reg(name)?;
                let line = self.next_line();
                self.program
                    .add_instruction(Instruction::new(Opcode::SyscallRead).with_dest(InstrArg::new(dest)), line);
                Ok(())
            }
            Stmt::Print(e) => {
                let t = self.program.new_register();
                self.emit_expr_into(e, t)?;
                let line = self.next_line();
                self.program.add_instruction(
                    Instruction::new(Opcode::SyscallPrint).with_src1(InstrArg::new(t)),
                    line,
                );
                Ok(())
            }
            Stmt::While(cond, body) => self.emit_while(cond, body),
            Stmt::If(cond, then_body, else_body) => self.emit_if(cond, then_body, else_body),
        }
    }

    fn emit_while(&mut self, cond: &Cond, body: &[Stmt]) -> CompileResult<()> {
        let loop_start = self.program.assign_new_label(Some("while_start"));
        let loop_end = self.program.new_label(Some("while_end"));
        self.emit_cond_branch(cond, true, loop_end)?;
        for s in body {
            self.emit_stmt(s)?;
        }
        let line = self.next_line();
        self.program
            .add_instruction(Instruction::new(Opcode::J).with_address_label(loop_start), line);
        self.program.assign_label(loop_end);
        Ok(())
    }

    fn emit_if(&mut self, cond: &Cond, then_body: &[Stmt], else_body: &[Stmt]) -> CompileResult<()> {
        let else_label = self.program.new_label(Some("if_else"));
        self.emit_cond_branch(cond, true, else_label)?;
        for s in then_body {
            self.emit_stmt(s)?;
        }
        if else_body.is_empty() {
            self.program.assign_label(else_label);
        } else {
            let end_label = self.program.new_label(Some("if_end"));
            let line = self.next_line();
            self.program
                .add_instruction(Instruction::new(Opcode::J).with_address_label(end_label), line);
            self.program.assign_label(else_label);
            for s in else_body {
                self.emit_stmt(s)?;
            }
            self.program.assign_label(end_label);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::lex;

    #[test]
    fn parses_decl_assign_and_print() {
        let path = Path::new("t.src");
        let tokens = lex(path, "int a; a = 1 + 2; print(a);").unwrap();
        let items = parse(path, tokens).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn undeclared_variable_is_a_semantic_error() {
        let mut program = Program::new();
        let mut codegen = Codegen::new(&mut program, Path::new("t.src"));
        let stmt = Item::Stmt(Stmt::Assign("missing".into(), Expr::Num(1)));
        let result = codegen.emit_item(&stmt);
        assert!(result.is_err());
    }
}
