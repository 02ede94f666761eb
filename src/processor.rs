use serde_json::{Map, Value};

use crate::{
    config::ValidationConfig,
    digest::KeywordError,
    pointer::JsonPointer,
    report::{Aborted, Domain, LogLevel, Message, Report},
    resolver,
    tree::SchemaTree,
    util::*,
    Validator,
};

/// One step of validation: the schema node that applies to an instance
/// value, and the chain of steps that led to it.
pub(crate) struct Context<'a> {
    validator: &'a Validator,
    schema: SchemaTree,
    instance: &'a Value,
    instance_ptr: JsonPointer,
    explore_all: bool,
    depth: usize,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    pub(crate) fn schema(&self) -> &SchemaTree {
        &self.schema
    }

    pub(crate) fn instance(&self) -> &'a Value {
        self.instance
    }

    pub(crate) fn config(&self) -> &ValidationConfig {
        &self.validator.config
    }

    pub(crate) fn message(&self, level: LogLevel, kw: &str, text: impl Into<String>) -> Message {
        Message::new(level, Domain::Validation, text)
            .keyword(kw)
            .schema(self.schema.current_ref())
            .instance(self.instance_ptr.clone())
    }

    pub(crate) fn error(&self, kw: &str, text: impl Into<String>) -> Message {
        self.message(LogLevel::Error, kw, text)
    }

    fn fatal(&self, domain: Domain, text: impl Into<String>) -> Message {
        Message::new(LogLevel::Fatal, domain, text)
            .schema(self.schema.current_ref())
            .instance(self.instance_ptr.clone())
    }

    /// Validates the same instance against the subschema at `rel`.
    pub(crate) fn validate_branch(&self, rel: &JsonPointer, report: &mut Report) -> Result<(), Aborted> {
        let schema = match self.schema.append(rel) {
            Ok(schema) => schema,
            Err(e) => return report.log(self.fatal(Domain::Syntax, e.to_string())),
        };
        process(
            self.validator,
            self,
            schema,
            self.instance,
            self.instance_ptr.clone(),
            report,
        )
    }

    /// Validates the member or element `token` of the instance against
    /// the subschema at `rel`.
    fn validate_child(
        &self,
        rel: &JsonPointer,
        token: &str,
        value: &'a Value,
        report: &mut Report,
    ) -> Result<(), Aborted> {
        let schema = match self.schema.append(rel) {
            Ok(schema) => schema,
            Err(e) => return report.log(self.fatal(Domain::Syntax, e.to_string())),
        };
        process(
            self.validator,
            self,
            schema,
            value,
            self.instance_ptr.prop(token),
            report,
        )
    }

    // an ancestor already validating the same instance against the same node
    fn find_loop(&self) -> Option<&Context<'a>> {
        let mut cur = self.parent;
        while let Some(cx) = cur {
            if cx.instance_ptr == self.instance_ptr
                && cx.schema.current_ref() == self.schema.current_ref()
            {
                return Some(cx);
            }
            cur = cx.parent;
        }
        None
    }

    fn keyword_error(&self, e: KeywordError) -> Message {
        self.fatal(Domain::Syntax, e.to_string())
            .keyword(e.keyword)
            .arg("reason", e.src.to_string())
    }
}

/// Validates `instance` against `schema` into a new report.
pub(crate) fn validate(
    validator: &Validator,
    schema: &SchemaTree,
    instance: &Value,
    explore_all: bool,
) -> Result<Report, Aborted> {
    let cfg = &validator.config;
    let mut report = Report::new(cfg.log_level, cfg.fatal_threshold);
    let root = Context {
        validator,
        schema: schema.clone(),
        instance,
        instance_ptr: JsonPointer::root(),
        explore_all,
        depth: 0,
        parent: None,
    };
    process_node(root, &mut report)?;
    Ok(report)
}

fn process<'a>(
    validator: &'a Validator,
    parent: &'a Context<'a>,
    schema: SchemaTree,
    instance: &'a Value,
    instance_ptr: JsonPointer,
    report: &mut Report,
) -> Result<(), Aborted> {
    let cx = Context {
        validator,
        schema,
        instance,
        instance_ptr,
        explore_all: parent.explore_all,
        depth: parent.depth + 1,
        parent: Some(parent),
    };
    process_node(cx, report)
}

fn process_node(cx: Context<'_>, report: &mut Report) -> Result<(), Aborted> {
    let max_depth = cx.config().max_depth;
    if cx.depth > max_depth {
        let msg = cx
            .fatal(Domain::Validation, "maximum validation depth exceeded")
            .arg("maxDepth", max_depth);
        return report.log(msg);
    }

    let mut cx = cx;
    cx.schema = match resolver::resolve(&cx.validator.service, &cx.schema) {
        Ok(schema) => schema,
        Err(e) => {
            let msg = cx.fatal(e.domain(), e.to_string());
            return report.log(e.annotate(msg));
        }
    };
    tracing::trace!(schema = %cx.schema.current_ref(), instance = %cx.instance_ptr, "validating");

    if let Some(prev) = cx.find_loop() {
        let msg = cx
            .fatal(Domain::Validation, "validation loop: schema visited twice for same instance")
            .arg("visited", prev.schema.current_ref().to_string());
        return report.log(msg);
    }

    let Value::Object(node) = cx.schema.current_node() else {
        let msg = cx
            .fatal(Domain::Syntax, "schema is not an object")
            .arg("found", quote(&cx.schema.current_node().to_string()));
        return report.log(msg);
    };

    let dialect = cx.schema.dialect();
    let ignored = node
        .keys()
        .filter(|kw| !dialect.recognizes(kw))
        .map(|kw| Value::String(kw.clone()))
        .collect::<Vec<_>>();
    if !ignored.is_empty() {
        let msg = Message::new(
            LogLevel::Info,
            Domain::Syntax,
            "unknown keywords found in schema; ignored",
        )
        .schema(cx.schema.current_ref())
        .instance(cx.instance_ptr.clone())
        .arg("ignored", ignored);
        report.log(msg)?;
    }

    let checks = match cx.validator.digests.checks(dialect, node) {
        Ok(checks) => checks,
        Err(e) => return report.log(cx.keyword_error(e)),
    };

    let mut sub = report.with_fatal_threshold(report.threshold());
    for check in checks {
        check.validate(&cx, &mut sub)?;
    }
    if sub.is_success() || cx.explore_all {
        explore(&cx, node, &mut sub)?;
    }
    report.merge(sub)
}

// routes each member or element of the instance to its subschemas
fn explore(cx: &Context<'_>, node: &Map<String, Value>, report: &mut Report) -> Result<(), Aborted> {
    let digests = &cx.validator.digests;
    match cx.instance {
        Value::Object(obj) => {
            let routing = match digests.object_routing(node) {
                Ok(Some(routing)) => routing,
                Ok(None) => return Ok(()),
                Err(e) => return report.log(cx.keyword_error(e)),
            };
            for (name, value) in obj {
                for rel in routing.select_schemas(name) {
                    cx.validate_child(&rel, name, value, report)?;
                }
            }
        }
        Value::Array(arr) => {
            let routing = match digests.array_routing(node) {
                Ok(Some(routing)) => routing,
                Ok(None) => return Ok(()),
                Err(e) => return report.log(cx.keyword_error(e)),
            };
            for (i, value) in arr.iter().enumerate() {
                for rel in routing.select_schemas(i) {
                    cx.validate_child(&rel, &i.to_string(), value, report)?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}
