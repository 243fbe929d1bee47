//! The pages of the greeter.

use crate::Greeting;
use ramverk::persistence::Db;
use ramverk::{Args, Environment, Error, Form, Module, Response, Scanner};
use serde_json::json;

/// Registers `greet_visitor` and `set_greeting` on `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frontend;

impl Module for Frontend {
    fn path(&self) -> &str {
        "greeter.frontend"
    }

    fn register(&self, scanner: &mut Scanner<'_>) -> Result<(), Error> {
        scanner.get("/", "greet_visitor", greet_visitor)?.post("/", "set_greeting", set_greeting)?;
        Ok(())
    }
}

/// Shows the greeting, as JSON when the query has a `json` argument.
async fn greet_visitor(env: Environment, args: Args, greeting: Db<Greeting>) -> Result<Response, Error> {
    let Greeting { greeting } = greeting.get()?;
    let template = if args.contains("json") { "json" } else { "index.html" };
    env.render(template, &json!({ "greeting": greeting }))
}

async fn set_greeting(env: Environment, form: Form, greeting: Db<Greeting>) -> Result<Response, Error> {
    let text = form.get("greeting").ok_or_else(|| Error::bad_request("Missing `greeting` field"))?;
    greeting.save(&Greeting { greeting: text.to_owned() })?;
    env.redirect(":greet_visitor", ())
}
