//! Abstract syntax for the demo front end.

#[derive(Clone, Debug)]
pub enum Expr {
    Num(i32),
    Var(String),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, Debug)]
pub enum BinOp {
    Add,
    Sub,
}

#[derive(Clone, Copy, Debug)]
pub enum Rel {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

#[derive(Clone, Debug)]
pub struct Cond {
    pub lhs: Expr,
    pub rel: Rel,
    pub rhs: Expr,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Assign(String, Expr),
    Read(String),
    Print(Expr),
    While(Cond, Vec<Stmt>),
    If(Cond, Vec<Stmt>, Vec<Stmt>),
}

#[derive(Clone, Debug)]
pub enum Item {
    Decl(String),
    Stmt(Stmt),
}
