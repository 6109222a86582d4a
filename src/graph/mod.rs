use anyhow::{Result, Context};
use regex::Regex;
use rio_api::model::{Literal, Subject, Term, Triple};
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleError, TurtleParser};
use rio_xml::{RdfXmlError, RdfXmlParser};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl RdfTriple {
    pub fn new(subject: String, predicate: String, object: String) -> Self {
        Self { subject, predicate, object }
    }

    fn from_rio(triple: &Triple<'_>) -> Self {
        Self {
            subject: subject_to_string(&triple.subject),
            predicate: triple.predicate.iri.to_string(),
            object: term_to_string(&triple.object),
        }
    }
}

fn subject_to_string(subject: &Subject<'_>) -> String {
    match subject {
        Subject::NamedNode(n) => n.iri.to_string(),
        Subject::BlankNode(b) => b.id.to_string(),
        Subject::Triple(t) => t.to_string(),
    }
}

fn term_to_string(term: &Term<'_>) -> String {
    match term {
        Term::NamedNode(n) => n.iri.to_string(),
        Term::BlankNode(b) => b.id.to_string(),
        Term::Literal(l) => literal_to_string(l),
        Term::Triple(t) => t.to_string(),
    }
}

fn literal_to_string(literal: &Literal<'_>) -> String {
    match literal {
        Literal::Simple { value }
        | Literal::LanguageTaggedString { value, .. }
        | Literal::Typed { value, .. } => (*value).to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimpleSparqlResults {
    Solutions(Vec<HashMap<String, String>>),
    Boolean(bool),
}

/// In-memory RDF graph loaded from a serialized file.
pub struct RdfGraph {
    triples: Vec<RdfTriple>,
}

impl RdfGraph {
    /// Parse a graph file. RDF/XML is assumed; `.ttl`/`.turtle` and `.nt`
    /// files parse as Turtle and N-Triples respectively.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open RDF file: {}", path.display()))?;
        let reader = BufReader::new(file);

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let triples = match extension {
            "ttl" | "turtle" => Self::parse_turtle(reader)?,
            "nt" => Self::parse_ntriples(reader)?,
            _ => Self::parse_rdf_xml(reader)?,
        };

        info!("Parsed {} triples from: {}", triples.len(), path.display());
        Ok(Self { triples })
    }

    pub fn from_triples(triples: Vec<RdfTriple>) -> Self {
        Self { triples }
    }

    fn parse_rdf_xml<R: std::io::BufRead>(reader: R) -> Result<Vec<RdfTriple>> {
        let mut triples = Vec::new();
        RdfXmlParser::new(reader, None)
            .parse_all(&mut |t| -> std::result::Result<(), RdfXmlError> {
                triples.push(RdfTriple::from_rio(&t));
                Ok(())
            })
            .context("Failed to parse RDF/XML")?;
        Ok(triples)
    }

    fn parse_turtle<R: std::io::BufRead>(reader: R) -> Result<Vec<RdfTriple>> {
        let mut triples = Vec::new();
        TurtleParser::new(reader, None)
            .parse_all(&mut |t| -> std::result::Result<(), TurtleError> {
                triples.push(RdfTriple::from_rio(&t));
                Ok(())
            })
            .context("Failed to parse Turtle")?;
        Ok(triples)
    }

    fn parse_ntriples<R: std::io::BufRead>(reader: R) -> Result<Vec<RdfTriple>> {
        let mut triples = Vec::new();
        NTriplesParser::new(reader)
            .parse_all(&mut |t| -> std::result::Result<(), TurtleError> {
                triples.push(RdfTriple::from_rio(&t));
                Ok(())
            })
            .context("Failed to parse N-Triples")?;
        Ok(triples)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn execute_sparql(&self, query: &str) -> Result<SimpleSparqlResults> {
        debug!("Executing simplified SPARQL query: {}", query);

        let trimmed = query.trim();
        let lowered = trimmed.to_lowercase();
        if lowered.starts_with("select") {
            self.execute_select(trimmed)
        } else if lowered.starts_with("ask") {
            Ok(SimpleSparqlResults::Boolean(!self.triples.is_empty()))
        } else {
            anyhow::bail!("Only SELECT and ASK queries are supported in this simplified implementation");
        }
    }

    fn execute_select(&self, query: &str) -> Result<SimpleSparqlResults> {
        let variables = select_variables(query);
        let names = binding_names(&variables);
        let limit = parse_limit(query);

        let mut rows = Vec::new();
        for triple in &self.triples {
            if let Some(limit) = limit {
                if rows.len() >= limit {
                    break;
                }
            }

            let mut row = HashMap::new();
            row.insert(names[0].to_string(), triple.subject.clone());
            row.insert(names[1].to_string(), triple.predicate.clone());
            row.insert(names[2].to_string(), triple.object.clone());
            rows.push(row);
        }

        Ok(SimpleSparqlResults::Solutions(rows))
    }

    /// Execute a query and stringify the rows, one per line, in
    /// select-variable order.
    pub fn query_to_text(&self, query: &str) -> Result<String> {
        let variables = select_variables(query);
        let names = binding_names(&variables);

        match self.execute_sparql(query)? {
            SimpleSparqlResults::Solutions(rows) => {
                let lines: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        let values: Vec<&str> = names
                            .iter()
                            .map(|name| row.get(*name).map(String::as_str).unwrap_or(""))
                            .collect();
                        format!("({})", values.join(", "))
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            SimpleSparqlResults::Boolean(result) => Ok(result.to_string()),
        }
    }
}

fn binding_names(variables: &[String]) -> [&str; 3] {
    if variables.len() == 3 {
        [&variables[0], &variables[1], &variables[2]]
    } else {
        ["subject", "predicate", "object"]
    }
}

fn select_variables(query: &str) -> Vec<String> {
    let Ok(clause_re) = Regex::new(r"(?is)SELECT\s+(.+?)\s+WHERE") else {
        return Vec::new();
    };
    let Ok(var_re) = Regex::new(r"\?(\w+)") else {
        return Vec::new();
    };

    clause_re
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|clause| {
            var_re
                .captures_iter(clause.as_str())
                .map(|c| c[1].to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_limit(query: &str) -> Option<usize> {
    let re = Regex::new(r"(?i)\bLIMIT\s+(\d+)").ok()?;
    re.captures(query)?.get(1)?.as_str().parse().ok()
}
