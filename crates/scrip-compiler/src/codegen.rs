//! Code generation: contract AST → located instruction stream.
//!
//! Expressions are lowered post-order onto a modelled VM stack (`Vec<Slot>`,
//! last element = top). Every variable lives in a stack slot and is read with
//! `<depth> OP_PICK`.
//!
//! Entry stack, top first: constructor parameters, the function selector (only
//! when the contract has several functions), then the function parameters.
//!
//! Locations: each instruction carries the location of the node that produced
//! it, or of the nearest enclosing located node. Leaves use
//! [`PositionHint::Start`]; operators, calls and checks use
//! [`PositionHint::End`]. The function epilogue belongs to the function
//! (`End`), the dispatch prologue to the function (`Start`), and the closing
//! `OP_ENDIF`s of a multi-function contract to the contract (`End`).

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use scrip_ast::{BinaryOp, Block, Contract, Expr, ExprKind, Function, Literal, Stmt, StmtKind, TimeOpKind, TypeName, UnaryOp};
use scrip_core::script::{Opcode, ScriptOp};
use scrip_core::{Location, PositionHint};

use crate::error::{CodeGenError, CodeGenErrorKind};
use crate::instruction::{Instruction, RequireSite};

use PositionHint::{End, Start};

type CgResult<T> = Result<T, CodeGenError>;

/// Location used when neither a node nor any of its ancestors has one.
const UNLOCATED: Location = Location::new(0, 0, 1, 1, 1, 1);

/// Lowers a contract. Instructions are unoptimised.
pub fn generate(contract: &Contract) -> CgResult<Vec<Instruction>> {
    CodeGenerator::new(contract).run()
}

/* ─────────────────────────── Static tables ─────────────────────────── */

/// Argument constraint of a built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    Int,
    Bytes,
    Any,
    Exact(TypeName),
}

impl Want {
    fn accepts(self, ty: TypeName) -> bool {
        match self {
            Self::Int => ty == TypeName::Int,
            Self::Bytes => ty.is_bytes_like(),
            Self::Any => true,
            Self::Exact(t) => t == ty,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Int => "int".into(),
            Self::Bytes => "a bytes-like value".into(),
            Self::Any => "a value".into(),
            Self::Exact(t) => t.to_string(),
        }
    }
}

struct Builtin {
    name: &'static str,
    params: &'static [Want],
    op: Opcode,
    ret: TypeName,
}

const BUILTINS: &[Builtin] = &[
    Builtin { name: "abs", params: &[Want::Int], op: Opcode::OP_ABS, ret: TypeName::Int },
    Builtin { name: "min", params: &[Want::Int, Want::Int], op: Opcode::OP_MIN, ret: TypeName::Int },
    Builtin { name: "max", params: &[Want::Int, Want::Int], op: Opcode::OP_MAX, ret: TypeName::Int },
    Builtin { name: "within", params: &[Want::Int, Want::Int, Want::Int], op: Opcode::OP_WITHIN, ret: TypeName::Bool },
    Builtin { name: "ripemd160", params: &[Want::Any], op: Opcode::OP_RIPEMD160, ret: TypeName::Bytes(Some(20)) },
    Builtin { name: "sha1", params: &[Want::Any], op: Opcode::OP_SHA1, ret: TypeName::Bytes(Some(20)) },
    Builtin { name: "sha256", params: &[Want::Any], op: Opcode::OP_SHA256, ret: TypeName::Bytes(Some(32)) },
    Builtin { name: "hash160", params: &[Want::Any], op: Opcode::OP_HASH160, ret: TypeName::Bytes(Some(20)) },
    Builtin { name: "hash256", params: &[Want::Any], op: Opcode::OP_HASH256, ret: TypeName::Bytes(Some(32)) },
    Builtin {
        name: "checkSig",
        params: &[Want::Exact(TypeName::Sig), Want::Exact(TypeName::PubKey)],
        op: Opcode::OP_CHECKSIG,
        ret: TypeName::Bool,
    },
    Builtin {
        name: "checkDataSig",
        params: &[Want::Exact(TypeName::DataSig), Want::Bytes, Want::Exact(TypeName::PubKey)],
        op: Opcode::OP_CHECKDATASIG,
        ret: TypeName::Bool,
    },
    Builtin { name: "toPaddedBytes", params: &[Want::Int, Want::Int], op: Opcode::OP_NUM2BIN, ret: TypeName::Bytes(None) },
];

/// `tx.inputs[i].<field>`
const INPUT_FIELDS: &[(&str, Opcode, TypeName)] = &[
    ("value", Opcode::OP_UTXOVALUE, TypeName::Int),
    ("lockingBytecode", Opcode::OP_UTXOBYTECODE, TypeName::Bytes(None)),
    ("outpointTransactionHash", Opcode::OP_OUTPOINTTXHASH, TypeName::Bytes(Some(32))),
    ("outpointIndex", Opcode::OP_OUTPOINTINDEX, TypeName::Int),
    ("unlockingBytecode", Opcode::OP_INPUTBYTECODE, TypeName::Bytes(None)),
    ("sequenceNumber", Opcode::OP_INPUTSEQUENCENUMBER, TypeName::Int),
    ("tokenCategory", Opcode::OP_UTXOTOKENCATEGORY, TypeName::Bytes(None)),
    ("nftCommitment", Opcode::OP_UTXOTOKENCOMMITMENT, TypeName::Bytes(None)),
    ("tokenAmount", Opcode::OP_UTXOTOKENAMOUNT, TypeName::Int),
];

/// `tx.outputs[i].<field>`
const OUTPUT_FIELDS: &[(&str, Opcode, TypeName)] = &[
    ("value", Opcode::OP_OUTPUTVALUE, TypeName::Int),
    ("lockingBytecode", Opcode::OP_OUTPUTBYTECODE, TypeName::Bytes(None)),
    ("tokenCategory", Opcode::OP_OUTPUTTOKENCATEGORY, TypeName::Bytes(None)),
    ("nftCommitment", Opcode::OP_OUTPUTTOKENCOMMITMENT, TypeName::Bytes(None)),
    ("tokenAmount", Opcode::OP_OUTPUTTOKENAMOUNT, TypeName::Int),
];

/* ─────────────────────────── Stack model ─────────────────────────── */

#[derive(Debug, Clone)]
struct Slot {
    /// `None` for intermediate values and the function selector.
    name: Option<String>,
    ty: TypeName,
}

impl Slot {
    fn named(name: &str, ty: TypeName) -> Self { Self { name: Some(name.to_string()), ty } }
    const fn value(ty: TypeName) -> Self { Self { name: None, ty } }
}

/// What an expression leaves on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Single(TypeName),
    /// Two slots, second on top (`split`).
    Pair(TypeName, TypeName),
}

impl Value {
    fn describe(self) -> String {
        match self {
            Self::Single(t) => t.to_string(),
            Self::Pair(a, b) => format!("({a}, {b})"),
        }
    }
}

struct CodeGenerator<'c> {
    contract: &'c Contract,
    out: Vec<Instruction>,
    stack: Vec<Slot>,
}

impl<'c> CodeGenerator<'c> {
    const fn new(contract: &'c Contract) -> Self { Self { contract, out: Vec::new(), stack: Vec::new() } }

    fn run(mut self) -> CgResult<Vec<Instruction>> {
        let contract = self.contract;
        let root = contract.location.unwrap_or(UNLOCATED);
        let count = contract.functions.len();
        if count == 0 {
            return fail(CodeGenErrorKind::Unsupported("contract without functions".into()), root);
        }
        debug!(contract = %contract.name, functions = count, "lowering contract");

        for (i, function) in contract.functions.iter().enumerate() {
            let loc = function.location.unwrap_or(root);
            let last = i + 1 == count;
            self.enter(function, count > 1);
            if count > 1 {
                self.dispatch(i, last, loc);
            }
            self.function(function, loc)?;
            if !last {
                self.op(Opcode::OP_ELSE, loc, End);
            }
        }
        for _ in 1..count {
            self.op(Opcode::OP_ENDIF, root, End);
        }
        Ok(self.out)
    }

    /* ─────────── Functions ─────────── */

    fn enter(&mut self, function: &Function, selector: bool) {
        let contract = self.contract;
        self.stack.clear();
        self.stack.extend(function.params.iter().rev().map(|p| Slot::named(&p.name, p.ty)));
        if selector {
            self.stack.push(Slot::value(TypeName::Int));
        }
        self.stack.extend(contract.params.iter().rev().map(|p| Slot::named(&p.name, p.ty)));
    }

    /// `<selector depth> OP_PICK|OP_ROLL <i> OP_NUMEQUAL OP_IF|OP_VERIFY`
    fn dispatch(&mut self, index: usize, last: bool, loc: Location) {
        let depth = self.contract.params.len();
        self.int(count(depth), loc, Start);
        if last {
            self.op(Opcode::OP_ROLL, loc, Start);
            if let Some(at) = self.stack.len().checked_sub(depth + 1) {
                self.stack.remove(at);
            }
        } else {
            self.op(Opcode::OP_PICK, loc, Start);
        }
        self.int(count(index), loc, Start);
        self.op(Opcode::OP_NUMEQUAL, loc, Start);
        self.op(if last { Opcode::OP_VERIFY } else { Opcode::OP_IF }, loc, Start);
    }

    fn function(&mut self, function: &Function, loc: Location) -> CgResult<()> {
        if !ends_with_check(&function.body) {
            return fail(CodeGenErrorKind::MissingFinalRequire(function.name.clone()), loc);
        }
        trace!(function = %function.name, params = function.params.len(), "lowering function");
        let body = function.body.location.unwrap_or(loc);
        for stmt in &function.body.stmts {
            self.stmt(stmt, body)?;
        }
        self.epilogue(loc);
        Ok(())
    }

    /// Leaves exactly one truthy value on the stack.
    fn epilogue(&mut self, loc: Location) {
        let ends_in_verify = self.out.last().is_some_and(|i| i.op.is(Opcode::OP_VERIFY));
        if ends_in_verify && self.stack.len() < 4 {
            // the checked value becomes the result, checked by the last instruction
            let site = self.out.pop().and_then(|verify| verify.check);
            for _ in 0..self.stack.len() {
                self.op(Opcode::OP_NIP, loc, End);
            }
            if let Some(last) = self.out.last_mut() {
                last.check = site;
            }
        } else {
            let mut left = self.stack.len();
            while left >= 2 {
                self.op(Opcode::OP_2DROP, loc, End);
                left -= 2;
            }
            if left == 1 {
                self.op(Opcode::OP_DROP, loc, End);
            }
            self.op(Opcode::OP_1, loc, End);
        }
        self.stack.clear();
    }

    /* ─────────── Statements ─────────── */

    fn stmt(&mut self, stmt: &Stmt, ctx: Location) -> CgResult<()> {
        let loc = stmt.location.unwrap_or(ctx);
        match &stmt.kind {
            StmtKind::VariableDefinition { ty, name, value } => {
                self.ensure_fresh(name, loc)?;
                let found = self.single(value, loc)?;
                expect_assignable(*ty, found, value.location.unwrap_or(loc))?;
                self.rename(0, name, *ty);
            }
            StmtKind::TupleAssignment { left, right, value } => {
                self.ensure_fresh(&left.1, loc)?;
                self.ensure_fresh(&right.1, loc)?;
                if left.1 == right.1 {
                    return fail(CodeGenErrorKind::Redefinition(right.1.clone()), loc);
                }
                let at = value.location.unwrap_or(loc);
                let Value::Pair(a, b) = self.expr(value, loc)? else {
                    let found = self.stack.last().map_or_else(String::new, |s| s.ty.to_string());
                    return fail(mismatch("a tuple", found), at);
                };
                expect_assignable(left.0, a, at)?;
                expect_assignable(right.0, b, at)?;
                self.rename(1, &left.1, left.0);
                self.rename(0, &right.1, right.0);
            }
            StmtKind::Assign { name, value } => {
                let Some((depth, declared)) = self.lookup(name) else {
                    return fail(CodeGenErrorKind::UndefinedIdentifier(name.clone()), loc);
                };
                let found = self.single(value, loc)?;
                expect_assignable(declared, found, value.location.unwrap_or(loc))?;
                self.replace(depth + 1, loc);
                self.stack.pop();
            }
            StmtKind::Require { condition, message } => {
                self.condition(condition, loc)?;
                self.op(Opcode::OP_VERIFY, loc, End);
                self.mark(loc, message.as_deref());
                self.stack.pop();
            }
            StmtKind::TimeOp { kind, value, message } => {
                let found = self.single(value, loc)?;
                expect(Want::Int, found, value.location.unwrap_or(loc))?;
                let check = match kind {
                    TimeOpKind::Time => Opcode::OP_CHECKLOCKTIMEVERIFY,
                    TimeOpKind::Age => Opcode::OP_CHECKSEQUENCEVERIFY,
                };
                self.op(check, loc, End);
                self.mark(loc, message.as_deref());
                self.op(Opcode::OP_DROP, loc, End);
                self.stack.pop();
            }
            StmtKind::If { condition, then_block, else_block } => {
                self.condition(condition, loc)?;
                self.op(Opcode::OP_IF, condition.location.unwrap_or(loc), End);
                self.stack.pop();
                self.branch(then_block, loc)?;
                if let Some(otherwise) = else_block {
                    self.op(Opcode::OP_ELSE, otherwise.location.unwrap_or(loc), Start);
                    self.branch(otherwise, loc)?;
                }
                self.op(Opcode::OP_ENDIF, loc, End);
            }
        }
        trace!(ops = self.out.len(), depth = self.stack.len(), "statement lowered");
        Ok(())
    }

    /// Lowers a block and drops the variables it declared.
    fn branch(&mut self, block: &Block, ctx: Location) -> CgResult<()> {
        let loc = block.location.unwrap_or(ctx);
        let height = self.stack.len();
        for stmt in &block.stmts {
            self.stmt(stmt, loc)?;
        }
        for _ in height..self.stack.len() {
            self.op(Opcode::OP_DROP, loc, End);
        }
        self.stack.truncate(height);
        Ok(())
    }

    fn condition(&mut self, condition: &Expr, ctx: Location) -> CgResult<()> {
        let found = self.single(condition, ctx)?;
        expect(Want::Exact(TypeName::Bool), found, condition.location.unwrap_or(ctx))
    }

    /// Moves the top value into the slot `index` deep, dropping the old value.
    fn replace(&mut self, index: usize, loc: Location) {
        self.int(count(index), loc, End);
        self.op(Opcode::OP_ROLL, loc, End);
        self.op(Opcode::OP_DROP, loc, End);
        for i in 0..index.saturating_sub(1) {
            self.op(Opcode::OP_SWAP, loc, End);
            if i + 2 < index {
                self.op(Opcode::OP_TOALTSTACK, loc, End);
            }
        }
        for _ in 0..index.saturating_sub(2) {
            self.op(Opcode::OP_FROMALTSTACK, loc, End);
        }
    }

    /* ─────────── Expressions ─────────── */

    fn single(&mut self, e: &Expr, ctx: Location) -> CgResult<TypeName> {
        match self.expr(e, ctx)? {
            Value::Single(ty) => Ok(ty),
            pair @ Value::Pair(..) => fail(mismatch("a single value", pair.describe()), e.location.unwrap_or(ctx)),
        }
    }

    fn expr(&mut self, e: &Expr, ctx: Location) -> CgResult<Value> {
        let loc = e.location.unwrap_or(ctx);
        match &e.kind {
            ExprKind::Literal(lit) => {
                let (op, ty) = literal(lit);
                self.emit(op, loc, Start);
                Ok(self.produce(0, ty))
            }
            ExprKind::Identifier(name) => {
                let Some((depth, ty)) = self.lookup(name) else {
                    return fail(CodeGenErrorKind::UndefinedIdentifier(name.clone()), loc);
                };
                self.int(count(depth), loc, Start);
                self.op(Opcode::OP_PICK, loc, Start);
                Ok(self.produce(0, ty))
            }
            ExprKind::Binary { op, left, right } => self.binary(*op, left, right, loc),
            ExprKind::Unary { op, expr } => {
                let found = self.single(expr, loc)?;
                let (opcode, ty) = match (op, found) {
                    (UnaryOp::Not, TypeName::Bool) => (Opcode::OP_NOT, TypeName::Bool),
                    (UnaryOp::Neg, TypeName::Int) => (Opcode::OP_NEGATE, TypeName::Int),
                    (UnaryOp::Not, _) => return fail(mismatch("bool", found), loc),
                    (UnaryOp::Neg, _) => return fail(mismatch("int", found), loc),
                };
                self.op(opcode, loc, End);
                Ok(self.produce(1, ty))
            }
            ExprKind::Call { name, args } => self.call(name, args, loc),
            ExprKind::MethodCall { receiver, method, args } => self.method(receiver, method, args, loc),
            ExprKind::Member { object, member } => self.member(object, member, loc),
            ExprKind::Index { object, index } => self.index(object, index, loc),
            ExprKind::Array(_) => fail(CodeGenErrorKind::Unsupported("array literal outside checkMultiSig".into()), loc),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, loc: Location) -> CgResult<Value> {
        let l = self.single(left, loc)?;
        let r = self.single(right, loc)?;
        let Some((ops, ty)) = binary_ops(op, l, r) else {
            return fail(mismatch(format!("operands valid for `{op}`"), format!("{l} {op} {r}")), loc);
        };
        for opcode in ops {
            self.op(opcode, loc, End);
        }
        Ok(self.produce(2, ty))
    }

    fn call(&mut self, name: &str, args: &[Expr], loc: Location) -> CgResult<Value> {
        if let Some(target) = TypeName::from_name(name) {
            return self.cast(target, name, args, loc);
        }
        if name == "checkMultiSig" {
            return self.check_multisig(args, loc);
        }
        let Some(builtin) = BUILTINS.iter().find(|b| b.name == name) else {
            return fail(CodeGenErrorKind::UnknownFunction(name.to_string()), loc);
        };
        arity(name, builtin.params.len(), args.len(), loc)?;
        for (arg, want) in args.iter().zip(builtin.params) {
            let found = self.single(arg, loc)?;
            expect(*want, found, arg.location.unwrap_or(loc))?;
        }
        self.op(builtin.op, loc, End);
        Ok(self.produce(args.len(), builtin.ret))
    }

    fn cast(&mut self, target: TypeName, name: &str, args: &[Expr], loc: Location) -> CgResult<Value> {
        arity(name, 1, args.len(), loc)?;
        let from = self.single(&args[0], loc)?;
        match (target, from) {
            (TypeName::Int, f) if f.is_bytes_like() => self.op(Opcode::OP_BIN2NUM, loc, End),
            (TypeName::Int | TypeName::Bool, TypeName::Int | TypeName::Bool) => {}
            (TypeName::Bytes(Some(size)), TypeName::Int) => {
                self.int(i64::from(size), loc, End);
                self.op(Opcode::OP_NUM2BIN, loc, End);
            }
            (TypeName::Bytes(_), TypeName::Int | TypeName::Bool) => {}
            (t, f) if t.is_bytes_like() && f.is_bytes_like() => {}
            _ => return fail(mismatch(format!("a value castable to {target}"), from), loc),
        }
        Ok(self.produce(1, target))
    }

    /// `OP_0 <sigs…> <#sigs> <pks…> <#pks> OP_CHECKMULTISIG`
    fn check_multisig(&mut self, args: &[Expr], loc: Location) -> CgResult<Value> {
        arity("checkMultiSig", 2, args.len(), loc)?;
        let (ExprKind::Array(sigs), ExprKind::Array(pks)) = (&args[0].kind, &args[1].kind) else {
            return fail(mismatch("[sig] and [pubkey] array literals", "non-array argument"), loc);
        };
        self.op(Opcode::OP_0, loc, Start);
        self.produce(0, TypeName::Int);
        self.array(&args[0], sigs, TypeName::Sig, loc)?;
        self.array(&args[1], pks, TypeName::PubKey, loc)?;
        self.op(Opcode::OP_CHECKMULTISIG, loc, End);
        Ok(self.produce(sigs.len() + pks.len() + 3, TypeName::Bool))
    }

    fn array(&mut self, array: &Expr, items: &[Expr], ty: TypeName, ctx: Location) -> CgResult<()> {
        let loc = array.location.unwrap_or(ctx);
        for item in items {
            let found = self.single(item, loc)?;
            expect(Want::Exact(ty), found, item.location.unwrap_or(loc))?;
        }
        self.int(count(items.len()), loc, End);
        self.produce(0, TypeName::Int);
        Ok(())
    }

    fn method(&mut self, receiver: &Expr, method: &str, args: &[Expr], loc: Location) -> CgResult<Value> {
        let rt = self.single(receiver, loc)?;
        expect(Want::Bytes, rt, receiver.location.unwrap_or(loc))?;
        let part = if rt == TypeName::String { TypeName::String } else { TypeName::Bytes(None) };
        let (params, ops, value): (usize, SmallVec<[Opcode; 8]>, Value) = match method {
            "reverse" => (0, smallvec![Opcode::OP_REVERSEBYTES], Value::Single(rt)),
            "split" => (1, smallvec![Opcode::OP_SPLIT], Value::Pair(part, part)),
            "slice" => (
                2,
                smallvec![
                    Opcode::OP_ROT,
                    Opcode::OP_SWAP,
                    Opcode::OP_SPLIT,
                    Opcode::OP_DROP,
                    Opcode::OP_SWAP,
                    Opcode::OP_SPLIT,
                    Opcode::OP_NIP,
                ],
                Value::Single(part),
            ),
            _ => return fail(CodeGenErrorKind::UnknownFunction(method.to_string()), loc),
        };
        arity(method, params, args.len(), loc)?;
        for arg in args {
            let found = self.single(arg, loc)?;
            expect(Want::Int, found, arg.location.unwrap_or(loc))?;
        }
        for opcode in ops {
            self.op(opcode, loc, End);
        }
        self.pop(1 + params);
        match value {
            Value::Single(ty) => self.stack.push(Slot::value(ty)),
            Value::Pair(a, b) => self.stack.extend([Slot::value(a), Slot::value(b)]),
        }
        Ok(value)
    }

    fn member(&mut self, object: &Expr, member: &str, loc: Location) -> CgResult<Value> {
        if let Some(root) = object.as_identifier() {
            let (opcode, ty) = match (root, member) {
                ("this", "activeInputIndex") => (Opcode::OP_INPUTINDEX, TypeName::Int),
                ("this", "activeBytecode") => (Opcode::OP_ACTIVEBYTECODE, TypeName::Bytes(None)),
                ("tx", "version") => (Opcode::OP_TXVERSION, TypeName::Int),
                ("tx", "locktime") => (Opcode::OP_TXLOCKTIME, TypeName::Int),
                ("tx", "time" | "age") => {
                    let msg = format!("`tx.{member}` is only usable as `require(tx.{member} >= …)`");
                    return fail(CodeGenErrorKind::Unsupported(msg), loc);
                }
                ("tx" | "this", _) => {
                    return fail(CodeGenErrorKind::Unsupported(format!("unknown field `{root}.{member}`")), loc);
                }
                _ => return self.length(object, member, loc),
            };
            self.op(opcode, loc, Start);
            return Ok(self.produce(0, ty));
        }

        if member == "length" {
            let count_op = match tx_list(object) {
                Some("inputs") => Some(Opcode::OP_TXINPUTCOUNT),
                Some("outputs") => Some(Opcode::OP_TXOUTPUTCOUNT),
                _ => None,
            };
            if let Some(opcode) = count_op {
                self.op(opcode, loc, End);
                return Ok(self.produce(0, TypeName::Int));
            }
        }

        if let ExprKind::Index { object: list, index } = &object.kind {
            let fields = match tx_list(list) {
                Some("inputs") => Some(INPUT_FIELDS),
                Some("outputs") => Some(OUTPUT_FIELDS),
                _ => None,
            };
            if let Some(fields) = fields {
                let Some(&(_, opcode, ty)) = fields.iter().find(|(name, ..)| *name == member) else {
                    return fail(CodeGenErrorKind::Unsupported(format!("unknown UTXO field `{member}`")), loc);
                };
                let found = self.single(index, loc)?;
                expect(Want::Int, found, index.location.unwrap_or(loc))?;
                self.op(opcode, loc, End);
                return Ok(self.produce(1, ty));
            }
        }

        self.length(object, member, loc)
    }

    /// `x.length` → `OP_SIZE OP_NIP`
    fn length(&mut self, object: &Expr, member: &str, loc: Location) -> CgResult<Value> {
        if member != "length" {
            return fail(CodeGenErrorKind::Unsupported(format!("member access `.{member}`")), loc);
        }
        let found = self.single(object, loc)?;
        expect(Want::Bytes, found, object.location.unwrap_or(loc))?;
        self.op(Opcode::OP_SIZE, loc, End);
        self.op(Opcode::OP_NIP, loc, End);
        Ok(self.produce(1, TypeName::Int))
    }

    /// Tuple element: `[0]` → `OP_DROP`, `[1]` → `OP_NIP`
    fn index(&mut self, object: &Expr, index: &Expr, loc: Location) -> CgResult<Value> {
        if let Some(list) = tx_list(object) {
            let msg = format!("`tx.{list}[i]` must be followed by a field");
            return fail(CodeGenErrorKind::Unsupported(msg), loc);
        }
        let second = match index.kind {
            ExprKind::Literal(Literal::Int(0)) => false,
            ExprKind::Literal(Literal::Int(1)) => true,
            _ => return fail(CodeGenErrorKind::InvalidTupleIndex, index.location.unwrap_or(loc)),
        };
        let Value::Pair(a, b) = self.expr(object, loc)? else {
            return fail(CodeGenErrorKind::Unsupported("indexing a non-tuple value".into()), loc);
        };
        if second {
            self.op(Opcode::OP_NIP, loc, End);
            Ok(self.produce(2, b))
        } else {
            self.op(Opcode::OP_DROP, loc, End);
            Ok(self.produce(2, a))
        }
    }

    /* ─────────── Emission & stack bookkeeping ─────────── */

    fn emit(&mut self, op: ScriptOp, location: Location, hint: PositionHint) {
        self.out.push(Instruction::new(op, location, hint));
    }

    fn op(&mut self, op: Opcode, location: Location, hint: PositionHint) { self.emit(ScriptOp::Op(op), location, hint) }

    fn int(&mut self, n: i64, location: Location, hint: PositionHint) { self.emit(ScriptOp::int(n), location, hint) }

    /// Tags the last emitted instruction as the check of a `require`.
    fn mark(&mut self, loc: Location, message: Option<&str>) {
        if let Some(last) = self.out.last_mut() {
            last.check = Some(RequireSite { line: loc.line, message: message.map(str::to_string) });
        }
    }

    fn pop(&mut self, n: usize) {
        let keep = self.stack.len().saturating_sub(n);
        self.stack.truncate(keep);
    }

    /// Replaces the top `consumed` slots with one value of type `ty`.
    fn produce(&mut self, consumed: usize, ty: TypeName) -> Value {
        self.pop(consumed);
        self.stack.push(Slot::value(ty));
        Value::Single(ty)
    }

    /// Depth (0 = top) and type of a named slot.
    fn lookup(&self, name: &str) -> Option<(usize, TypeName)> {
        self.stack.iter().rev().enumerate().find(|(_, s)| s.name.as_deref() == Some(name)).map(|(d, s)| (d, s.ty))
    }

    fn ensure_fresh(&self, name: &str, loc: Location) -> CgResult<()> {
        if self.lookup(name).is_some() {
            return fail(CodeGenErrorKind::Redefinition(name.to_string()), loc);
        }
        Ok(())
    }

    fn rename(&mut self, depth: usize, name: &str, ty: TypeName) {
        let Some(at) = self.stack.len().checked_sub(depth + 1) else { return };
        self.stack[at] = Slot::named(name, ty);
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

fn fail<T>(kind: CodeGenErrorKind, location: Location) -> CgResult<T> { Err(CodeGenError::new(kind, Some(location))) }

fn mismatch(expected: impl ToString, found: impl ToString) -> CodeGenErrorKind {
    CodeGenErrorKind::TypeMismatch { expected: expected.to_string(), found: found.to_string() }
}

fn expect(want: Want, found: TypeName, location: Location) -> CgResult<()> {
    if want.accepts(found) { Ok(()) } else { fail(mismatch(want.describe(), found), location) }
}

fn arity(name: &str, expected: usize, found: usize, location: Location) -> CgResult<()> {
    if expected == found {
        return Ok(());
    }
    fail(CodeGenErrorKind::WrongArity { name: name.to_string(), expected, found }, location)
}

/// `bytes` accepts any fixed-size bytes and the key/signature types.
fn expect_assignable(to: TypeName, from: TypeName, location: Location) -> CgResult<()> {
    let ok = to == from
        || matches!(
            (to, from),
            (TypeName::Bytes(_), TypeName::Bytes(_))
                | (TypeName::Bytes(None), TypeName::PubKey | TypeName::Sig | TypeName::DataSig)
        );
    if ok { Ok(()) } else { fail(mismatch(to, from), location) }
}

fn count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

fn literal(lit: &Literal) -> (ScriptOp, TypeName) {
    match lit {
        Literal::Int(n) => (ScriptOp::int(*n), TypeName::Int),
        Literal::Bool(b) => (ScriptOp::bool(*b), TypeName::Bool),
        Literal::Str(s) => (ScriptOp::push(s.as_bytes()), TypeName::String),
        Literal::Hex(bytes) => {
            let size = u16::try_from(bytes.len()).ok().filter(|n| (1..=520).contains(n));
            (ScriptOp::push(bytes.as_slice()), TypeName::Bytes(size))
        }
    }
}

fn binary_ops(op: BinaryOp, l: TypeName, r: TypeName) -> Option<(SmallVec<[Opcode; 2]>, TypeName)> {
    use TypeName::{Bool, Int};
    let ints = l == Int && r == Int;
    let bools = l == Bool && r == Bool;
    let bytes = l.is_bytes_like() && r.is_bytes_like();
    let joined = if l == r { l } else { TypeName::Bytes(None) };
    Some(match op {
        BinaryOp::Add if ints => (smallvec![Opcode::OP_ADD], Int),
        BinaryOp::Add if bytes => (smallvec![Opcode::OP_CAT], joined_concat(l, r)),
        BinaryOp::Sub if ints => (smallvec![Opcode::OP_SUB], Int),
        BinaryOp::Mul if ints => (smallvec![Opcode::OP_MUL], Int),
        BinaryOp::Div if ints => (smallvec![Opcode::OP_DIV], Int),
        BinaryOp::Mod if ints => (smallvec![Opcode::OP_MOD], Int),
        BinaryOp::Eq if ints || bools => (smallvec![Opcode::OP_NUMEQUAL], Bool),
        BinaryOp::Eq if bytes => (smallvec![Opcode::OP_EQUAL], Bool),
        BinaryOp::Ne if ints || bools => (smallvec![Opcode::OP_NUMNOTEQUAL], Bool),
        BinaryOp::Ne if bytes => (smallvec![Opcode::OP_EQUAL, Opcode::OP_NOT], Bool),
        BinaryOp::Lt if ints => (smallvec![Opcode::OP_LESSTHAN], Bool),
        BinaryOp::Le if ints => (smallvec![Opcode::OP_LESSTHANOREQUAL], Bool),
        BinaryOp::Gt if ints => (smallvec![Opcode::OP_GREATERTHAN], Bool),
        BinaryOp::Ge if ints => (smallvec![Opcode::OP_GREATERTHANOREQUAL], Bool),
        BinaryOp::And if bools => (smallvec![Opcode::OP_BOOLAND], Bool),
        BinaryOp::Or if bools => (smallvec![Opcode::OP_BOOLOR], Bool),
        BinaryOp::BitAnd if bytes => (smallvec![Opcode::OP_AND], joined),
        BinaryOp::BitOr if bytes => (smallvec![Opcode::OP_OR], joined),
        BinaryOp::BitXor if bytes => (smallvec![Opcode::OP_XOR], joined),
        _ => return None,
    })
}

/// Concatenation keeps `string` only when both sides are strings.
fn joined_concat(l: TypeName, r: TypeName) -> TypeName {
    if l == TypeName::String && r == TypeName::String { TypeName::String } else { TypeName::Bytes(None) }
}

/// `tx.inputs` / `tx.outputs` → `"inputs"` / `"outputs"`
fn tx_list(e: &Expr) -> Option<&str> {
    let ExprKind::Member { object, member } = &e.kind else { return None };
    (object.as_identifier() == Some("tx") && matches!(member.as_str(), "inputs" | "outputs")).then_some(member.as_str())
}

/// True if the block's last statement is a check, or an `if`/`else` whose
/// branches both end in one.
fn ends_with_check(block: &Block) -> bool {
    match block.stmts.last().map(|s| &s.kind) {
        Some(StmtKind::Require { .. } | StmtKind::TimeOp { .. }) => true,
        Some(StmtKind::If { then_block, else_block: Some(otherwise), .. }) => {
            ends_with_check(then_block) && ends_with_check(otherwise)
        }
        _ => false,
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
