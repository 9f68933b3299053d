use crate::catalog::{
    docs_url, MASS_ASSIGNMENT_INSTANCE, MASS_ASSIGNMENT_STATIC, MODEL_BASES, NON_MODEL_CLASSES,
    NON_MODEL_SUFFIXES,
};
use crate::support::{php_trees, short_name, Source};
use engine::{aggregate, Category, Finding, Outcome, Rule, RuleMetadata, ScanContext, Severity};
use ir::{class_matches, Node, SyntaxNode};
use loader::RuleOptions;
use patterns::{InputSources, Matcher};

/// Eloquent writes fed with raw request input, and models that leave every
/// attribute assignable.
pub struct MassAssignment {
    meta: RuleMetadata,
    static_methods: Vec<String>,
    instance_methods: Vec<String>,
    non_model_classes: Vec<String>,
    check_models: bool,
}

fn listed(list: &[String], name: &str) -> bool {
    list.iter().any(|m| m.eq_ignore_ascii_case(name))
}

/// Readable form of an input expression: `request()->all()`, `$_POST`.
fn describe(node: &SyntaxNode) -> String {
    match &node.node {
        Node::Variable { name } => format!("${name}"),
        Node::FunctionCall { name, .. } => format!("{name}()"),
        Node::PropertyAccess { base, name } => format!("{}->{name}", describe(base)),
        Node::MethodCall { receiver, name, .. } => format!("{}->{name}()", describe(receiver)),
        Node::StaticCall { class, name, .. } => format!("{class}::{name}()"),
        Node::ArrayAccess { base, .. } => describe(base),
        _ => "request input".into(),
    }
}

impl MassAssignment {
    pub const ID: &'static str = "mass-assignment";

    pub fn new(options: &RuleOptions) -> Self {
        MassAssignment {
            meta: RuleMetadata::new(
                Self::ID,
                "Mass assignment",
                Category::Security,
                Severity::High,
            )
            .with_description(
                "Model writes receiving whole request payloads and models without $fillable or $guarded",
            )
            .with_tags(["security", "eloquent", "mass-assignment", "owasp-a04"])
            .with_docs_url(&docs_url(Self::ID))
            .with_fix_minutes(15),
            static_methods: options.str_list_or("static_methods", MASS_ASSIGNMENT_STATIC),
            instance_methods: options.str_list_or("instance_methods", MASS_ASSIGNMENT_INSTANCE),
            non_model_classes: options.str_list_or("non_model_classes", NON_MODEL_CLASSES),
            check_models: options.bool_or("check_models", true),
        }
    }

    fn is_non_model(&self, class: &str) -> bool {
        self.non_model_classes.iter().any(|c| class_matches(class, c))
    }

    /// Label of the write when `node` is a mass-assignment call.
    fn sink(&self, node: &SyntaxNode, sources: &InputSources) -> Option<String> {
        match &node.node {
            Node::StaticCall { class, name, .. }
                if listed(&self.static_methods, name)
                    && !self.is_non_model(class)
                    && !sources.is_request_facade(class) =>
            {
                Some(format!("{class}::{name}()"))
            }
            Node::MethodCall { receiver, name, .. }
                if listed(&self.instance_methods, name) && !sources.is_request_holder(receiver) =>
            {
                Some(format!("->{name}()"))
            }
            _ => None,
        }
    }

    /// `request()->except(...)`, `$request->except(...)` or
    /// `Request::except(...)` anywhere in `arg`.
    fn blacklist_filter<'a>(arg: &'a SyntaxNode, sources: &InputSources) -> Option<&'a SyntaxNode> {
        arg.walk().find(|n| match &n.node {
            Node::MethodCall { receiver, name, .. } => {
                name.eq_ignore_ascii_case("except") && sources.is_request_holder(receiver)
            }
            Node::StaticCall { class, name, .. } => {
                name.eq_ignore_ascii_case("except") && sources.is_request_facade(class)
            }
            _ => false,
        })
    }

    fn check_calls(&self, src: &Source, nodes: &[SyntaxNode], findings: &mut Vec<Finding>) {
        let sources = InputSources::shared();
        let mut matcher = Matcher::new(sources);
        for node in nodes.iter().flat_map(|n| n.walk()) {
            let Some(sink) = self.sink(node, sources) else {
                continue;
            };
            let args = node.call_args();
            if let Some(input) = args
                .iter()
                .find_map(|a| matcher.find_first_tainted_input_node(a))
            {
                let input = describe(input);
                findings.push(
                    src.node_finding(
                        node,
                        Severity::Critical,
                        format!("{sink} receives unfiltered request input ({input})"),
                        "Pass only validated fields, e.g. $request->validated() or $request->only([...]).",
                    )
                    .with_metadata("sink", sink)
                    .with_metadata("input", input),
                );
            } else if args
                .iter()
                .any(|a| Self::blacklist_filter(a, sources).is_some())
            {
                findings.push(
                    src.node_finding(
                        node,
                        Severity::High,
                        format!("{sink} receives request input narrowed with except() (blacklist filtering)"),
                        "Whitelist the accepted fields with only() or validated(); except() lets new fields through.",
                    )
                    .with_metadata("sink", sink),
                );
            }
        }
    }

    fn check_model(&self, src: &Source, class: &SyntaxNode, findings: &mut Vec<Finding>) {
        let Node::Class {
            name,
            extends,
            members,
            ..
        } = &class.node
        else {
            return;
        };
        let extends_model = extends
            .as_deref()
            .is_some_and(|e| MODEL_BASES.iter().any(|b| class_matches(e, b)));
        let suffixed = NON_MODEL_SUFFIXES.iter().any(|s| name.ends_with(s));
        if suffixed && !extends_model {
            return;
        }

        let property = |wanted: &str| {
            members.iter().find_map(|m| match &m.node {
                Node::Property { name, default, .. } if name == wanted => Some((m, default)),
                _ => None,
            })
        };
        let short = short_name(name);
        if let Some((prop, default)) = property("guarded") {
            let empty = matches!(
                default.as_deref().map(|d| &d.node),
                Some(Node::ArrayLiteral { items }) if items.is_empty()
            );
            if empty {
                findings.push(
                    src.node_finding(
                        prop,
                        Severity::High,
                        format!("Model {short} sets $guarded = [], leaving every attribute mass assignable"),
                        "List the assignable attributes in $fillable instead of emptying $guarded.",
                    )
                    .with_metadata("model", short),
                );
            }
        } else if property("fillable").is_none() {
            findings.push(
                src.node_finding(
                    class,
                    Severity::Medium,
                    format!("Model {short} defines neither $fillable nor $guarded"),
                    "Declare $fillable with the attributes that may be mass assigned.",
                )
                .with_metadata("model", short),
            );
        }
    }
}

impl Rule for MassAssignment {
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
            self.check_calls(&src, &ast.nodes, &mut findings);
        }
        if self.check_models {
            let models = ctx.files().models.iter().map(|p| p.as_path());
            for (src, ast) in php_trees(ctx, models) {
                for class in ir::find_classes(&ast.nodes) {
                    self.check_model(&src, class, &mut findings);
                }
            }
        }
        Ok(aggregate(
            findings,
            "No mass assignment exposure found",
            "{count} mass assignment issue(s)",
        ))
    }
}
