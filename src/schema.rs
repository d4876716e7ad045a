use std::collections::HashMap;
use std::sync::OnceLock;

/// Reserved wire code for a subtree reference (spec.md §4.6).
pub const SUBTREE_REF_TYPE_CODE: u32 = 0;
/// Reserved wire code for a template reference (spec.md §4.6).
pub const TEMPLATE_REF_TYPE_CODE: u32 = 1;
/// Reserved wire code for a raw single-character identifier (spec.md §4.6).
pub const RAW_IDENT_TYPE_CODE: u32 = 2;
/// First wire code available to registered node types (spec.md §4.6).
pub const FIRST_NODE_TYPE_CODE: u32 = 3;

/// A scalar attribute descriptor (spec.md §3 "Field").
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub array: bool,
    pub optional: bool,
    pub deleted: bool,
}

/// A child / child-array relation descriptor (spec.md §3 "Field" shape,
/// reused for branches per spec.md §3 "Node").
#[derive(Clone, Debug)]
pub struct BranchDescriptor {
    pub name: &'static str,
    pub array: bool,
    pub optional: bool,
    pub deleted: bool,
}

/// A declared node type: unique name, short alias, ordered fields, ordered
/// branches (spec.md §3 "Node type").
#[derive(Clone, Debug)]
pub struct NodeType {
    pub name: &'static str,
    pub alias: &'static str,
    pub code: u32,
    pub fields: Vec<FieldDescriptor>,
    pub branches: Vec<BranchDescriptor>,
}

impl NodeType {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name && !f.deleted)
    }

    pub fn branch(&self, name: &str) -> Option<&BranchDescriptor> {
        self.branches.iter().find(|b| b.name == name && !b.deleted)
    }
}

pub struct Registry {
    pub types: Vec<NodeType>,
    by_name: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn lookup(&self, name: &str) -> Option<&NodeType> {
        self.by_name.get(name).map(|&idx| &self.types[idx])
    }

    /// The always-available sloppy fallback type (spec.md §3 invariants).
    pub fn unknown(&self) -> &NodeType {
        self.lookup("Unknown").expect("Unknown type must be registered")
    }
}

fn field(name: &'static str, array: bool, optional: bool) -> FieldDescriptor {
    FieldDescriptor { name, array, optional, deleted: false }
}

fn branch(name: &'static str, array: bool, optional: bool) -> BranchDescriptor {
    BranchDescriptor { name, array, optional, deleted: false }
}

fn req_field(name: &'static str) -> FieldDescriptor {
    field(name, false, false)
}

fn opt_field(name: &'static str) -> FieldDescriptor {
    field(name, false, true)
}

fn req_branch(name: &'static str) -> BranchDescriptor {
    branch(name, false, false)
}

fn opt_branch(name: &'static str) -> BranchDescriptor {
    branch(name, false, true)
}

fn arr_branch(name: &'static str) -> BranchDescriptor {
    branch(name, true, false)
}

/// Builds the built-in registry covering the common ECMAScript node set
/// named in spec.md §6 (Identifier, Literal, CallExpression,
/// MemberExpression, VariableDeclaration, FunctionDeclaration,
/// BlockStatement, BinaryExpression, etc.), plus the always-available
/// `Unknown` fallback.
fn build_registry() -> Registry {
    let mut types = vec![
        NodeType { code: 0, name: "Unknown", alias: "Unk", fields: vec![], branches: vec![] },
        NodeType {
            code: 0,
            name: "Program",
            alias: "Prog",
            fields: vec![req_field("sourceType")],
            branches: vec![arr_branch("body")],
        },
        NodeType {
            code: 0,
            name: "Identifier",
            alias: "Id",
            fields: vec![req_field("name")],
            branches: vec![],
        },
        NodeType {
            code: 0,
            name: "Literal",
            alias: "Lit",
            fields: vec![req_field("value")],
            branches: vec![],
        },
        NodeType {
            code: 0,
            name: "ExpressionStatement",
            alias: "ExprStmt",
            fields: vec![],
            branches: vec![req_branch("expression")],
        },
        NodeType {
            code: 0,
            name: "EmptyStatement",
            alias: "EmptyStmt",
            fields: vec![],
            branches: vec![],
        },
        NodeType {
            code: 0,
            name: "BlockStatement",
            alias: "Block",
            fields: vec![],
            branches: vec![arr_branch("body")],
        },
        NodeType {
            code: 0,
            name: "VariableDeclaration",
            alias: "VarDecl",
            fields: vec![req_field("kind")],
            branches: vec![arr_branch("declarations")],
        },
        NodeType {
            code: 0,
            name: "VariableDeclarator",
            alias: "VarDeclor",
            fields: vec![],
            branches: vec![req_branch("id"), opt_branch("init")],
        },
        NodeType {
            code: 0,
            name: "FunctionDeclaration",
            alias: "FnDecl",
            fields: vec![req_field("generator"), req_field("async")],
            branches: vec![opt_branch("id"), arr_branch("params"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "FunctionExpression",
            alias: "FnExpr",
            fields: vec![req_field("generator"), req_field("async")],
            branches: vec![opt_branch("id"), arr_branch("params"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "ArrowFunctionExpression",
            alias: "ArrowFn",
            fields: vec![req_field("generator"), req_field("async"), req_field("expression")],
            branches: vec![arr_branch("params"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "ReturnStatement",
            alias: "Ret",
            fields: vec![],
            branches: vec![opt_branch("argument")],
        },
        NodeType {
            code: 0,
            name: "IfStatement",
            alias: "If",
            fields: vec![],
            branches: vec![req_branch("test"), req_branch("consequent"), opt_branch("alternate")],
        },
        NodeType {
            code: 0,
            name: "ForStatement",
            alias: "For",
            fields: vec![],
            branches: vec![opt_branch("init"), opt_branch("test"), opt_branch("update"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "WhileStatement",
            alias: "While",
            fields: vec![],
            branches: vec![req_branch("test"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "DoWhileStatement",
            alias: "DoWhile",
            fields: vec![],
            branches: vec![req_branch("body"), req_branch("test")],
        },
        NodeType {
            code: 0,
            name: "BreakStatement",
            alias: "Break",
            fields: vec![],
            branches: vec![opt_branch("label")],
        },
        NodeType {
            code: 0,
            name: "ContinueStatement",
            alias: "Continue",
            fields: vec![],
            branches: vec![opt_branch("label")],
        },
        NodeType {
            code: 0,
            name: "ThrowStatement",
            alias: "Throw",
            fields: vec![],
            branches: vec![req_branch("argument")],
        },
        NodeType {
            code: 0,
            name: "TryStatement",
            alias: "Try",
            fields: vec![],
            branches: vec![req_branch("block"), opt_branch("handler"), opt_branch("finalizer")],
        },
        NodeType {
            code: 0,
            name: "CatchClause",
            alias: "Catch",
            fields: vec![],
            branches: vec![opt_branch("param"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "SwitchStatement",
            alias: "Switch",
            fields: vec![],
            branches: vec![req_branch("discriminant"), arr_branch("cases")],
        },
        NodeType {
            code: 0,
            name: "SwitchCase",
            alias: "Case",
            fields: vec![],
            branches: vec![opt_branch("test"), arr_branch("consequent")],
        },
        NodeType {
            code: 0,
            name: "LabeledStatement",
            alias: "Label",
            fields: vec![],
            branches: vec![req_branch("label"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "BinaryExpression",
            alias: "Bin",
            fields: vec![req_field("operator")],
            branches: vec![req_branch("left"), req_branch("right")],
        },
        NodeType {
            code: 0,
            name: "LogicalExpression",
            alias: "Logic",
            fields: vec![req_field("operator")],
            branches: vec![req_branch("left"), req_branch("right")],
        },
        NodeType {
            code: 0,
            name: "UnaryExpression",
            alias: "Unary",
            fields: vec![req_field("operator"), req_field("prefix")],
            branches: vec![req_branch("argument")],
        },
        NodeType {
            code: 0,
            name: "UpdateExpression",
            alias: "Update",
            fields: vec![req_field("operator"), req_field("prefix")],
            branches: vec![req_branch("argument")],
        },
        NodeType {
            code: 0,
            name: "AssignmentExpression",
            alias: "Assign",
            fields: vec![req_field("operator")],
            branches: vec![req_branch("left"), req_branch("right")],
        },
        NodeType {
            code: 0,
            name: "ConditionalExpression",
            alias: "Cond",
            fields: vec![],
            branches: vec![req_branch("test"), req_branch("consequent"), req_branch("alternate")],
        },
        NodeType {
            code: 0,
            name: "CallExpression",
            alias: "Call",
            fields: vec![],
            branches: vec![req_branch("callee"), arr_branch("arguments")],
        },
        NodeType {
            code: 0,
            name: "NewExpression",
            alias: "New",
            fields: vec![],
            branches: vec![req_branch("callee"), arr_branch("arguments")],
        },
        NodeType {
            code: 0,
            name: "MemberExpression",
            alias: "Member",
            fields: vec![req_field("computed")],
            branches: vec![req_branch("object"), req_branch("property")],
        },
        NodeType {
            code: 0,
            name: "ThisExpression",
            alias: "This",
            fields: vec![],
            branches: vec![],
        },
        NodeType {
            code: 0,
            name: "SequenceExpression",
            alias: "Seq",
            fields: vec![],
            branches: vec![arr_branch("expressions")],
        },
        NodeType {
            code: 0,
            name: "SpreadElement",
            alias: "Spread",
            fields: vec![],
            branches: vec![req_branch("argument")],
        },
        NodeType {
            code: 0,
            name: "ObjectExpression",
            alias: "Obj",
            fields: vec![],
            branches: vec![arr_branch("properties")],
        },
        NodeType {
            code: 0,
            name: "Property",
            alias: "Prop",
            fields: vec![req_field("computed"), req_field("shorthand"), req_field("method"), req_field("kind")],
            branches: vec![req_branch("key"), req_branch("value")],
        },
        NodeType {
            code: 0,
            name: "ArrayExpression",
            alias: "Arr",
            fields: vec![],
            branches: vec![arr_branch("elements")],
        },
        NodeType {
            code: 0,
            name: "TemplateLiteral",
            alias: "Tmpl",
            fields: vec![],
            branches: vec![arr_branch("quasis"), arr_branch("expressions")],
        },
        NodeType {
            code: 0,
            name: "TemplateElement",
            alias: "TmplEl",
            fields: vec![req_field("tail"), req_field("raw"), opt_field("cooked")],
            branches: vec![],
        },
        NodeType {
            code: 0,
            name: "ClassDeclaration",
            alias: "Class",
            fields: vec![],
            branches: vec![opt_branch("id"), opt_branch("superClass"), req_branch("body")],
        },
        NodeType {
            code: 0,
            name: "ClassBody",
            alias: "ClassBody",
            fields: vec![],
            branches: vec![arr_branch("body")],
        },
        NodeType {
            code: 0,
            name: "MethodDefinition",
            alias: "Method",
            fields: vec![req_field("kind"), req_field("static"), req_field("computed")],
            branches: vec![req_branch("key"), req_branch("value")],
        },
    ];

    for (idx, ty) in types.iter_mut().enumerate() {
        ty.code = FIRST_NODE_TYPE_CODE + idx as u32;
    }

    let by_name = types.iter().enumerate().map(|(i, t)| (t.name, i)).collect();

    Registry { types, by_name }
}

/// Returns the built-in, compile-time-declared schema registry.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}
