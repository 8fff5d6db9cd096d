//! HTML rendering with minijinja.
//!
//! Templates are compiled into the binary. Auto-escaping is on for every
//! `.html` template, so row values and SQL are always escaped.

use minijinja::{context, Environment};
use tabletalk_relay::{FieldList, Row, TableRef};

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("index.html", include_str!("../templates/index.html"))?;
        env.add_template("results.html", include_str!("../templates/results.html"))?;
        env.add_template(
            "results_table.html",
            include_str!("../templates/results_table.html"),
        )?;
        env.add_template("reauth.html", include_str!("../templates/reauth.html"))?;
        Ok(Self { env })
    }

    /// Landing page. `auth_url` is shown only while signed out.
    pub fn index(
        &self,
        table: &TableRef,
        authenticated: bool,
        auth_url: &str,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("index.html")?.render(context! {
            table => table.qualified(),
            authenticated,
            auth_url,
        })
    }

    /// Full results page for `sql`.
    pub fn results_page(
        &self,
        table: &TableRef,
        sql: &str,
        fields: &FieldList,
        rows: &[Row],
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("results.html")?.render(context! {
            table => table.qualified(),
            sql,
            fields => fields.names(),
            rows => cell_grid(rows),
        })
    }

    /// Table fragment swapped into the landing page by the front-end script.
    pub fn results_table(&self, fields: &FieldList, rows: &[Row]) -> Result<String, minijinja::Error> {
        self.env.get_template("results_table.html")?.render(context! {
            fields => fields.names(),
            rows => cell_grid(rows),
        })
    }

    /// Asks the user to sign in again.
    pub fn reauth(&self, auth_url: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template("reauth.html")?
            .render(context! { auth_url })
    }
}

fn cell_grid(rows: &[Row]) -> Vec<Vec<&str>> {
    rows.iter().map(|r| r.values().collect()).collect()
}
