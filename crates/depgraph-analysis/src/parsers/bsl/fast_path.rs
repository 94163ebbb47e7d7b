//! Tokenizing pass over a module: declarations, calls, metadata references
//! and traceability annotations. Bounded cost, never fails.

use std::sync::LazyLock;

use depgraph_core::types::collections::FxHashSet;
use depgraph_core::types::MetadataKind;
use regex::Regex;
use smallvec::SmallVec;

use super::keywords::{self, keyword, Keyword};
use super::lexer::{tokenize, Comment, Token, TokenKind};
use crate::parsers::types::{CallRef, DeclKind, Declaration, MetadataRef, StructuralRecord};

/// Query-text references inside string literals: `Справочник.Товары`.
static QUERY_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^\p{L}\p{N}_.])(Справочник|Catalog|Документ|Document|РегистрСведений|InformationRegister|РегистрНакопления|AccumulationRegister|РегистрБухгалтерии|AccountingRegister|РегистрРасчета|CalculationRegister|Перечисление|Enum|Константа|Constant|ПланВидовХарактеристик|ChartOfCharacteristicTypes|ПланСчетов|ChartOfAccounts|БизнесПроцесс|BusinessProcess|Задача|Task|ПланОбмена|ExchangePlan|ЖурналДокументов|DocumentJournal)\.([\p{L}_][\p{L}\p{N}_]*)",
    )
    .unwrap_or_else(|e| panic!("invalid query reference pattern: {e}"))
});

/// `// @requirement REQ-1, REQ-2` and `// @incident INC-7`.
static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@(requirement|incident)\b\s*:?\s*(.*)$")
        .unwrap_or_else(|e| panic!("invalid annotation pattern: {e}"))
});

static ANNOTATION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}_.\-]+$").unwrap_or_else(|e| panic!("invalid key pattern: {e}"))
});

struct OpenDecl {
    decl: Declaration,
    /// Lowercased parameters and locals; qualified calls through them are
    /// method calls on values, not module calls.
    locals: FxHashSet<String>,
    header_end: usize,
}

#[derive(Default)]
struct State {
    record: StructuralRecord,
    open: Option<OpenDecl>,
    regions: Vec<String>,
    pending_directives: SmallVec<[String; 2]>,
    /// Line of the last code token outside directives and preprocessor lines.
    last_code_line: u32,
    var_mode: bool,
}

impl State {
    fn current_decl(&self) -> Option<String> {
        self.open.as_ref().map(|o| o.decl.name.clone())
    }

    fn close(&mut self, line_end: u32) {
        if let Some(mut open) = self.open.take() {
            open.decl.line_range.1 = line_end.max(open.decl.line_range.0);
            self.record.declarations.push(open.decl);
        }
    }

    fn is_local(&self, lower: &str) -> bool {
        self.open.as_ref().is_some_and(|o| o.locals.contains(lower))
    }

    fn add_local(&mut self, lower: String) {
        if let Some(open) = self.open.as_mut() {
            open.locals.insert(lower);
        }
    }

    fn bump_complexity(&mut self) {
        if let Some(open) = self.open.as_mut() {
            open.decl.complexity += 1;
        }
    }
}

/// Extract the structural record of a module.
pub fn parse_module(source: &str) -> StructuralRecord {
    let lexed = tokenize(source);
    let tokens = &lexed.tokens;
    let mut st = State::default();
    let last_line = source.lines().count().max(1) as u32;

    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        match tok.kind {
            TokenKind::Preproc => {
                handle_preproc(&mut st, tok.text);
                i += 1;
                continue;
            }
            TokenKind::Directive => {
                if st.open.is_none() {
                    st.pending_directives.push(tok.text.to_string());
                }
                i += 1;
                continue;
            }
            TokenKind::Str => scan_query_text(&mut st, tok),
            TokenKind::Punct('?') => {
                if next_is_punct(tokens, i, '(') {
                    st.bump_complexity();
                }
            }
            TokenKind::Punct(';') => st.var_mode = false,
            TokenKind::Ident => {
                let lower = tok.text.to_lowercase();
                match keyword(&lower) {
                    Some(Keyword::Procedure | Keyword::Function) => {
                        if let Some(next) = parse_header(&mut st, tokens, i, &lexed.comments) {
                            i = next;
                            continue;
                        }
                    }
                    Some(Keyword::EndProcedure | Keyword::EndFunction) => st.close(tok.line),
                    Some(Keyword::If | Keyword::ElsIf | Keyword::While) => st.bump_complexity(),
                    Some(Keyword::For) => {
                        st.bump_complexity();
                        // Loop variable: `For I = ...` / `For Each Row In ...`.
                        let mut j = i + 1;
                        if tokens
                            .get(j)
                            .is_some_and(|t| keyword(&t.text.to_lowercase()) == Some(Keyword::Each))
                        {
                            j += 1;
                        }
                        if let Some(var) = tokens.get(j).filter(|t| t.kind == TokenKind::Ident) {
                            st.add_local(var.text.to_lowercase());
                        }
                    }
                    Some(Keyword::Var) => st.var_mode = true,
                    Some(_) => {}
                    None => handle_identifier(&mut st, tokens, i, lower),
                }
            }
            _ => {}
        }
        st.last_code_line = tok.line;
        i += 1;
    }

    if st.open.is_some() {
        st.close(last_line);
    }
    st.record.loc = source.lines().filter(|l| !l.trim().is_empty()).count() as u32;
    st.record
}

fn next_is_punct(tokens: &[Token<'_>], i: usize, c: char) -> bool {
    tokens.get(i + 1).is_some_and(|t| t.is_punct(c))
}

fn handle_preproc(st: &mut State, text: &str) {
    let mut words = text.split_whitespace();
    let Some(directive) = words.next() else {
        return;
    };
    match directive.to_lowercase().as_str() {
        "region" | "область" => {
            st.regions
                .push(words.next().unwrap_or_default().to_string());
        }
        "endregion" | "конецобласти" => {
            st.regions.pop();
        }
        _ => {}
    }
}

/// Parse `Procedure Name(params) Export`. Returns the index after the header,
/// or `None` when the keyword is not followed by a name.
fn parse_header(
    st: &mut State,
    tokens: &[Token<'_>],
    i: usize,
    comments: &[Comment<'_>],
) -> Option<usize> {
    let kw = tokens[i];
    let name = tokens.get(i + 1).filter(|t| t.kind == TokenKind::Ident)?;

    if st.open.is_some() {
        st.close(kw.line.saturating_sub(1));
    }

    let kind = match keyword(&kw.text.to_lowercase()) {
        Some(Keyword::Function) => DeclKind::Function,
        _ => DeclKind::Procedure,
    };

    let mut params: SmallVec<[String; 4]> = SmallVec::new();
    let mut j = i + 2;
    if tokens.get(j).is_some_and(|t| t.is_punct('(')) {
        j += 1;
        let mut expect_name = true;
        let mut depth = 0usize;
        while let Some(t) = tokens.get(j) {
            match t.kind {
                TokenKind::Punct('(') => depth += 1,
                TokenKind::Punct(')') if depth == 0 => {
                    j += 1;
                    break;
                }
                TokenKind::Punct(')') => depth -= 1,
                TokenKind::Punct(',') if depth == 0 => expect_name = true,
                TokenKind::Punct('=') => expect_name = false,
                TokenKind::Ident if expect_name => {
                    if keyword(&t.text.to_lowercase()) != Some(Keyword::Val) {
                        params.push(t.text.to_string());
                        expect_name = false;
                    }
                }
                _ => {}
            }
            j += 1;
        }
    }

    let mut is_export = false;
    if tokens
        .get(j)
        .is_some_and(|t| t.kind == TokenKind::Ident && keyword(&t.text.to_lowercase()) == Some(Keyword::Export))
    {
        is_export = true;
        j += 1;
    }

    let (requirements, incidents) = leading_annotations(comments, st.last_code_line, kw.line);
    let locals = params.iter().map(|p| p.to_lowercase()).collect();
    let header_line = tokens.get(j.saturating_sub(1)).map_or(kw.line, |t| t.line);

    st.open = Some(OpenDecl {
        decl: Declaration {
            name: name.text.to_string(),
            kind,
            is_export,
            line_range: (kw.line, kw.line),
            complexity: 1,
            params,
            region: st.regions.last().filter(|r| !r.is_empty()).cloned(),
            directives: std::mem::take(&mut st.pending_directives),
            requirements,
            incidents,
            deep: None,
        },
        locals,
        header_end: j,
    });
    st.last_code_line = header_line;
    Some(j)
}

/// Collect annotation keys from comments strictly between the previous code
/// line and the declaration keyword.
fn leading_annotations(
    comments: &[Comment<'_>],
    after_line: u32,
    before_line: u32,
) -> (Vec<String>, Vec<String>) {
    let mut requirements = Vec::new();
    let mut incidents = Vec::new();
    for comment in comments
        .iter()
        .filter(|c| c.line > after_line && c.line < before_line)
    {
        let Some(caps) = ANNOTATION.captures(comment.text) else {
            continue;
        };
        let target = if caps[1].eq_ignore_ascii_case("requirement") {
            &mut requirements
        } else {
            &mut incidents
        };
        for key in caps[2].split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
            if !key.is_empty() && ANNOTATION_KEY.is_match(key) && !target.iter().any(|k| k == key) {
                target.push(key.to_string());
            }
        }
    }
    (requirements, incidents)
}

fn is_statement_start(st: &State, tokens: &[Token<'_>], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    if st.open.as_ref().is_some_and(|o| o.header_end == i) {
        return true;
    }
    let prev = tokens[i - 1];
    match prev.kind {
        TokenKind::Punct(';') => true,
        TokenKind::Ident => keyword(&prev.text.to_lowercase()).is_some_and(keywords::opens_statement),
        _ => false,
    }
}

fn handle_identifier(st: &mut State, tokens: &[Token<'_>], i: usize, lower: String) {
    let tok = tokens[i];
    let prev = i.checked_sub(1).map(|p| tokens[p]);
    let prev_is_dot = prev.is_some_and(|p| p.is_punct('.'));

    if st.var_mode {
        st.add_local(lower);
        return;
    }

    // `Catalogs.Products`, `Metadata.Catalogs.Products`.
    if let Some(kind) = keywords::manager_kind(&lower) {
        let rooted = !prev_is_dot
            || (i >= 2 && keywords::is_metadata_root(&tokens[i - 2].text.to_lowercase()));
        if rooted && next_is_punct(tokens, i, '.') {
            if let Some(name) = tokens.get(i + 2).filter(|t| t.kind == TokenKind::Ident) {
                push_metadata_ref(st, kind, name.text, tok.line);
                return;
            }
        }
    }

    if next_is_punct(tokens, i, '=') && !prev_is_dot && is_statement_start(st, tokens, i) {
        st.add_local(lower);
        return;
    }

    if !next_is_punct(tokens, i, '(') {
        return;
    }
    if prev.is_some_and(|p| {
        p.kind == TokenKind::Ident && keyword(&p.text.to_lowercase()) == Some(Keyword::New)
    }) {
        return;
    }

    let qualifier = if prev_is_dot {
        let Some(head) = i.checked_sub(2).map(|h| tokens[h]) else {
            return;
        };
        if head.kind != TokenKind::Ident {
            return;
        }
        // Longer chains are method calls on expressions.
        if i >= 3 && tokens[i - 3].is_punct('.') {
            return;
        }
        let head_lower = head.text.to_lowercase();
        if keywords::is_self_reference(&head_lower) {
            None
        } else if st.is_local(&head_lower)
            || keywords::manager_kind(&head_lower).is_some()
            || keyword(&head_lower).is_some()
        {
            return;
        } else {
            Some(head.text.to_string())
        }
    } else {
        if keywords::is_builtin(&lower) {
            return;
        }
        None
    };

    let from_decl = st.current_decl();
    st.record.references.push(CallRef {
        from_decl,
        callee_name: tok.text.to_string(),
        qualifier,
        line: tok.line,
    });
}

fn push_metadata_ref(st: &mut State, kind: MetadataKind, name: &str, line: u32) {
    let from_decl = st.current_decl();
    st.record.metadata_refs.push(MetadataRef {
        from_decl,
        kind,
        name: name.to_string(),
        line,
    });
}

fn scan_query_text(st: &mut State, tok: Token<'_>) {
    for caps in QUERY_REF.captures_iter(tok.text) {
        let Some(kind) = keywords::singular_kind(&caps[1].to_lowercase()) else {
            continue;
        };
        let offset = caps.get(0).map_or(0, |m| m.start());
        let line = tok.line + tok.text[..offset].matches('\n').count() as u32;
        push_metadata_ref(st, kind, &caps[2], line);
    }
}
