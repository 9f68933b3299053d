use crate::catalog::{
    docs_url, DEFAULT_MIN_BCRYPT_COST, SAFE_PASSWORD_ALGORITHMS, WEAK_HASH_ALGORITHMS,
    WEAK_HASH_FUNCTIONS,
};
use crate::support::{array_path, env_call, php_trees, returned_array, Source};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{class_matches, Node, SyntaxNode};
use loader::RuleOptions;

const PASSWORD_NAMES: &[&str] = &["password", "passwd", "pass", "pwd", "secret"];

/// Weak password hashing: unknown `password_hash` algorithms, digests of
/// passwords and bcrypt costs below the configured minimum.
pub struct PasswordHashing {
    meta: RuleMetadata,
    min_cost: i64,
    safe_algorithms: Vec<String>,
    weak_functions: Vec<String>,
    weak_algorithms: Vec<String>,
    password_names: Vec<String>,
}

impl PasswordHashing {
    pub const ID: &'static str = "password-hashing";

    pub fn new(options: &RuleOptions) -> Self {
        PasswordHashing {
            meta: RuleMetadata::new(
                Self::ID,
                "Password hashing",
                Category::Security,
                Severity::Critical,
            )
            .with_description("Passwords hashed with weak algorithms or a low bcrypt cost")
            .with_tags(["security", "crypto", "passwords", "owasp-a02"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(10),
            min_cost: options.u64_or("min_bcrypt_cost", DEFAULT_MIN_BCRYPT_COST) as i64,
            safe_algorithms: options.str_list_or("safe_algorithms", SAFE_PASSWORD_ALGORITHMS),
            weak_functions: options.str_list_or("weak_functions", WEAK_HASH_FUNCTIONS),
            weak_algorithms: options.str_list_or("weak_algorithms", WEAK_HASH_ALGORITHMS),
            password_names: options
                .str_list_or("password_names", PASSWORD_NAMES)
                .into_iter()
                .map(|n| n.to_ascii_lowercase())
                .collect(),
        }
    }

    fn is_safe_algorithm(&self, node: &SyntaxNode) -> bool {
        let name = match &node.node {
            Node::ConstantRef { name } => name.as_str(),
            Node::StringLiteral { value } => value.as_str(),
            _ => return false,
        };
        self.safe_algorithms.iter().any(|a| class_matches(name, a))
    }

    fn is_password_name(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.password_names.iter().any(|p| name.contains(p.as_str()))
    }

    /// Whether the expression reads something named like a password:
    /// `$password`, `$user->password`, `$request->input('password')`.
    fn mentions_password(&self, node: &SyntaxNode) -> bool {
        node.walk().any(|n| match &n.node {
            Node::Variable { name } | Node::PropertyAccess { name, .. } => {
                self.is_password_name(name)
            }
            Node::StringLiteral { value } => self.is_password_name(value),
            _ => false,
        })
    }

    fn low_cost(&self, node: Option<&SyntaxNode>) -> Option<i64> {
        let cost = node?.as_int().or_else(|| {
            // env('BCRYPT_ROUNDS', 8)
            env_call(node?).and_then(|(_, default)| default?.as_int())
        })?;
        (cost < self.min_cost).then_some(cost)
    }

    fn check_call(&self, src: &Source, node: &SyntaxNode, findings: &mut Vec<Finding>) {
        match &node.node {
            Node::FunctionCall { name, args } if name.eq_ignore_ascii_case("password_hash") => {
                let known = args.get(1).is_some_and(|a| self.is_safe_algorithm(a));
                if !known {
                    findings.push(src.node_finding(
                        node,
                        Severity::Critical,
                        "password_hash() uses a weak or unknown algorithm",
                        "Pass PASSWORD_DEFAULT, PASSWORD_BCRYPT or PASSWORD_ARGON2ID explicitly, or use Hash::make().",
                    ));
                } else if let Some(cost) =
                    self.low_cost(args.get(2).and_then(|o| o.array_get("cost")))
                {
                    findings.push(self.cost_finding(src, node, "password_hash()", cost));
                }
            }
            Node::FunctionCall { name, args }
                if self.weak_functions.iter().any(|f| f.eq_ignore_ascii_case(name)) =>
            {
                if args.first().is_some_and(|a| self.mentions_password(a)) {
                    findings.push(self.digest_finding(src, node, name));
                }
            }
            Node::FunctionCall { name, args } if name.eq_ignore_ascii_case("hash") => {
                let weak = args.first().and_then(|a| a.as_str()).filter(|algo| {
                    self.weak_algorithms
                        .iter()
                        .any(|w| w.eq_ignore_ascii_case(algo))
                });
                if let Some(algo) = weak {
                    if args.get(1).is_some_and(|a| self.mentions_password(a)) {
                        findings.push(self.digest_finding(src, node, algo));
                    }
                }
            }
            Node::FunctionCall { name, args } if name.eq_ignore_ascii_case("bcrypt") => {
                if let Some(cost) = self.low_cost(args.get(1).and_then(|o| o.array_get("rounds"))) {
                    findings.push(self.cost_finding(src, node, "bcrypt()", cost));
                }
            }
            Node::StaticCall { class, name, args }
                if class_matches(class, "Hash") && name.eq_ignore_ascii_case("make") =>
            {
                if let Some(cost) = self.low_cost(args.get(1).and_then(|o| o.array_get("rounds"))) {
                    findings.push(self.cost_finding(src, node, "Hash::make()", cost));
                }
            }
            _ => {}
        }
    }

    fn digest_finding(&self, src: &Source, node: &SyntaxNode, algo: &str) -> Finding {
        src.node_finding(
            node,
            Severity::Critical,
            format!("Password hashed with {algo}, a fast digest unsuitable for passwords"),
            "Use Hash::make() or password_hash() with PASSWORD_DEFAULT.",
        )
        .with_metadata("algorithm", algo)
    }

    fn cost_finding(&self, src: &Source, node: &SyntaxNode, what: &str, cost: i64) -> Finding {
        src.node_finding(
            node,
            Severity::Medium,
            format!("{what} uses bcrypt cost {cost}, below the minimum of {}", self.min_cost),
            format!("Raise the cost to at least {}.", self.min_cost),
        )
        .with_metadata("cost", cost)
    }

    fn check_hashing_config(&self, ctx: &ScanContext, findings: &mut Vec<Finding>) {
        let Some(path) = ctx.files().config_file("hashing") else {
            return;
        };
        let Some(ast) = ctx.ast(path) else {
            return;
        };
        let Some(rounds) = returned_array(&ast).and_then(|c| array_path(c, "bcrypt.rounds")) else {
            return;
        };
        if let Some(cost) = self.low_cost(Some(rounds)) {
            let src = Source::new(ctx, path);
            findings.push(self.cost_finding(&src, rounds, "config/hashing.php", cost));
        }
    }
}

impl Rule for PasswordHashing {
    fn metadata(&self) -> &RuleMetadata {
        &self.meta
    }

    fn applies(&self, ctx: &ScanContext) -> bool {
        ctx.files().has_php()
    }

    fn skip_reason(&self) -> String {
        "no PHP files found".into()
    }

    fn execute(&self, ctx: &ScanContext) -> anyhow::Result<Outcome> {
        let mut findings = Vec::new();
        for (src, ast) in php_trees(ctx, ctx.files().php_files()) {
            for node in ast.walk() {
                self.check_call(&src, node, &mut findings);
            }
        }
        self.check_hashing_config(ctx, &mut findings);
        Ok(aggregate(
            findings,
            "Passwords are hashed with adaptive algorithms",
            "{count} weak password hashing issue(s)",
        ))
    }
}
