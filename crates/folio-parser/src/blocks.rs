//! Declaration block parsers: `meta`, `state`, `pageConfig`, `grid`,
//! `runtime`, `assets` and `materials`.
//!
//! Unknown fields inside these blocks are skipped with a recovery scan;
//! known fields with malformed values are hard errors.

use crate::error::ParseError;
use crate::stream::TokenStream;
use crate::values::{parse_duration, parse_literal_value, parse_number};
use folio_ast::{
    AdvanceSpec, AssetBank, AssetEntry, AssetsDecl, CellDecl, Document, EventsApply, GridDecl,
    PageConfig, Param, ParamType, PickStrategy, StateDecl, Value,
};
use folio_lexer::TokenKind;

pub fn parse_meta(ts: &mut TokenStream, doc: &mut Document) -> Result<(), ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let (key, _) = ts.expect_ident("a meta field name")?;
        ts.expect(&TokenKind::Eq)?;
        let value = parse_literal_value(ts)?;
        ts.expect(&TokenKind::Semi)?;
        doc.meta.insert(key, value.display_string());
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(())
}

pub fn parse_state(ts: &mut TokenStream, state: &mut StateDecl) -> Result<(), ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        if ts.check_kw("param") {
            ts.advance();
            state.params.push(parse_param(ts)?);
        } else {
            ts.skip_unknown_field();
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(())
}

fn parse_param(ts: &mut TokenStream) -> Result<Param, ParseError> {
    let (name, pos) = ts.expect_ident("a parameter name")?;
    let open = ts.peek();
    ts.expect(&TokenKind::LBrace)?;

    let mut ty = None;
    let mut min = None;
    let mut max = None;
    let mut variants = Vec::new();
    let mut initial = None;

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "a parameter field")),
        };
        match field_name.as_str() {
            "type" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                let token = ts.peek();
                let (tag, _) = ts.expect_ident("a parameter type")?;
                ty = Some(match tag.as_str() {
                    "int" => ParamType::Int,
                    "float" => ParamType::Float,
                    "bool" => ParamType::Bool,
                    "string" => ParamType::String,
                    "enum" => ParamType::Enum,
                    other => {
                        return Err(ParseError::at(
                            token,
                            format!("unknown parameter type '{other}'"),
                        ))
                    }
                });
                ts.expect(&TokenKind::Semi)?;
            }
            "min" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                let v = parse_number(ts, true, "a number or 'inf'")?;
                ts.expect(&TokenKind::Semi)?;
                // Open bound: inf means unbounded.
                min = v.is_finite().then_some(v);
            }
            "max" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                let v = parse_number(ts, true, "a number or 'inf'")?;
                ts.expect(&TokenKind::Semi)?;
                max = v.is_finite().then_some(v);
            }
            "variants" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                let token = ts.peek();
                match parse_literal_value(ts)? {
                    Value::List(items) => {
                        variants = items.into_iter().map(|v| v.display_string()).collect();
                    }
                    _ => return Err(ParseError::at(token, "variants must be a list")),
                }
                ts.expect(&TokenKind::Semi)?;
            }
            "initial" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                initial = Some(parse_literal_value(ts)?);
                ts.expect(&TokenKind::Semi)?;
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;

    let ty = ty.ok_or_else(|| ParseError::at(open, format!("param '{name}' is missing 'type'")))?;
    let initial =
        initial.ok_or_else(|| ParseError::at(open, format!("param '{name}' is missing 'initial'")))?;
    Ok(Param {
        name,
        ty,
        min,
        max,
        variants,
        initial,
        pos,
    })
}

pub fn parse_page_config(ts: &mut TokenStream) -> Result<PageConfig, ParseError> {
    let open = ts.peek();
    ts.expect(&TokenKind::LBrace)?;
    let mut width = None;
    let mut height = None;
    let mut units = "pt".to_string();

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "a pageConfig field")),
        };
        match field_name.as_str() {
            "width" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                width = Some(parse_number(ts, false, "a page width")?);
                ts.expect(&TokenKind::Semi)?;
            }
            "height" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                height = Some(parse_number(ts, false, "a page height")?);
                ts.expect(&TokenKind::Semi)?;
            }
            "units" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                units = parse_literal_value(ts)?.display_string();
                ts.expect(&TokenKind::Semi)?;
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;

    let width = width.ok_or_else(|| ParseError::at(open, "pageConfig is missing 'width'"))?;
    let height = height.ok_or_else(|| ParseError::at(open, "pageConfig is missing 'height'"))?;
    Ok(PageConfig {
        width,
        height,
        units,
    })
}

pub fn parse_grid(ts: &mut TokenStream) -> Result<GridDecl, ParseError> {
    let (name, pos) = ts.expect_ident("a grid name")?;
    ts.expect(&TokenKind::LBrace)?;

    let mut grid = GridDecl {
        name,
        topology: "rect".to_string(),
        page: None,
        rows: None,
        cols: None,
        cells: Vec::new(),
        pos,
    };

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "a grid field")),
        };
        match field_name.as_str() {
            "topology" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                grid.topology = parse_literal_value(ts)?.display_string();
                ts.expect(&TokenKind::Semi)?;
            }
            "page" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                grid.page = Some(parse_number(ts, false, "a page index")? as i64);
                ts.expect(&TokenKind::Semi)?;
            }
            "rows" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                grid.rows = Some(parse_count(ts, "a row count")?);
                ts.expect(&TokenKind::Semi)?;
            }
            "cols" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                grid.cols = Some(parse_count(ts, "a column count")?);
                ts.expect(&TokenKind::Semi)?;
            }
            "cell" => {
                ts.advance();
                grid.cells.push(parse_cell(ts)?);
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(grid)
}

fn parse_count(ts: &mut TokenStream, what: &str) -> Result<u32, ParseError> {
    let token = ts.peek();
    match token.kind {
        TokenKind::Int(v) if v >= 0 => {
            let count = u32::try_from(v)
                .map_err(|_| ParseError::at(token, format!("{v} is out of range for {what}")))?;
            ts.advance();
            Ok(count)
        }
        _ => Err(ParseError::expected(token, what)),
    }
}

fn parse_cell(ts: &mut TokenStream) -> Result<CellDecl, ParseError> {
    let (id, _) = ts.expect_ident("a cell id")?;
    ts.expect(&TokenKind::LBrace)?;
    let mut cell = CellDecl {
        id,
        ..CellDecl::default()
    };

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "a cell field")),
        };
        match field_name.as_str() {
            "tags" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                cell.tags = parse_tag_list(ts)?;
                ts.expect(&TokenKind::Semi)?;
            }
            "content" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                cell.content = Some(parse_literal_value(ts)?.display_string());
                ts.expect(&TokenKind::Semi)?;
            }
            "dynamic" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                cell.dynamic = Some(parse_number(ts, false, "a dynamic value")?);
                ts.expect(&TokenKind::Semi)?;
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(cell)
}

pub fn parse_tag_list(ts: &mut TokenStream) -> Result<Vec<String>, ParseError> {
    let token = ts.peek();
    match parse_literal_value(ts)? {
        Value::List(items) => Ok(items.into_iter().map(|v| v.display_string()).collect()),
        Value::Str(s) => Ok(vec![s]),
        _ => Err(ParseError::at(token, "expected a tag list")),
    }
}

pub fn parse_runtime(ts: &mut TokenStream, doc: &mut Document) -> Result<(), ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "a runtime field")),
        };
        match field_name.as_str() {
            "eventsApply" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                let token = ts.peek();
                let (tag, _) = ts.expect_ident("an events policy")?;
                doc.runtime.events_apply = match tag.as_str() {
                    "queued" => EventsApply::Queued,
                    "immediate" => EventsApply::Immediate,
                    other => {
                        return Err(ParseError::at(
                            token,
                            format!("unknown eventsApply policy '{other}'"),
                        ))
                    }
                };
                ts.expect(&TokenKind::Semi)?;
            }
            "docstepAdvance" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                if ts.eat(&TokenKind::LBracket) {
                    if !ts.check(&TokenKind::RBracket) {
                        loop {
                            doc.runtime.docstep_advance.push(parse_advance_spec(ts)?);
                            if !ts.eat(&TokenKind::Comma) {
                                break;
                            }
                            if ts.check(&TokenKind::RBracket) {
                                break;
                            }
                        }
                    }
                    ts.expect(&TokenKind::RBracket)?;
                } else {
                    doc.runtime.docstep_advance.push(parse_advance_spec(ts)?);
                }
                ts.expect(&TokenKind::Semi)?;
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(())
}

fn parse_advance_spec(ts: &mut TokenStream) -> Result<AdvanceSpec, ParseError> {
    let token = ts.peek();
    let pos = ts.pos();
    let (tag, _) = ts.expect_ident("an advance source")?;
    match tag.as_str() {
        "timer" => {
            ts.expect(&TokenKind::LParen)?;
            let d = parse_duration(ts)?;
            ts.expect(&TokenKind::RParen)?;
            Ok(AdvanceSpec::Timer {
                amount: d.amount,
                unit: d.unit,
                pos,
            })
        }
        other => Err(ParseError::at(
            token,
            format!("unknown advance source '{other}'"),
        )),
    }
}

pub fn parse_assets(ts: &mut TokenStream, assets: &mut AssetsDecl) -> Result<(), ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        if ts.check_kw("asset") {
            ts.advance();
            assets.entries.push(parse_asset_entry(ts)?);
        } else if ts.check_kw("bank") {
            ts.advance();
            assets.banks.push(parse_bank(ts)?);
        } else {
            ts.skip_unknown_field();
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(())
}

pub fn parse_materials(ts: &mut TokenStream, materials: &mut Vec<AssetEntry>) -> Result<(), ParseError> {
    ts.expect(&TokenKind::LBrace)?;
    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        if ts.check_kw("material") {
            ts.advance();
            materials.push(parse_asset_entry(ts)?);
        } else {
            ts.skip_unknown_field();
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(())
}

fn parse_asset_entry(ts: &mut TokenStream) -> Result<AssetEntry, ParseError> {
    let (name, _) = ts.expect_ident("an asset name")?;
    ts.expect(&TokenKind::LBrace)?;
    let mut entry = AssetEntry {
        name,
        ..AssetEntry::default()
    };

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "an asset field")),
        };
        match field_name.as_str() {
            "tags" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                entry.tags = parse_tag_list(ts)?;
                ts.expect(&TokenKind::Semi)?;
            }
            "file" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                entry.file = Some(ts.expect_str("a file path string")?);
                ts.expect(&TokenKind::Semi)?;
            }
            "weight" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                entry.weight = Some(parse_number(ts, false, "a weight")?);
                ts.expect(&TokenKind::Semi)?;
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;
    Ok(entry)
}

fn parse_bank(ts: &mut TokenStream) -> Result<AssetBank, ParseError> {
    let (name, _) = ts.expect_ident("a bank name")?;
    let open = ts.peek();
    ts.expect(&TokenKind::LBrace)?;
    let mut glob = None;
    let mut strategy = PickStrategy::Uniform;

    while !ts.check(&TokenKind::RBrace) && !ts.at_eof() {
        let field = ts.peek();
        let field_name = match &field.kind {
            TokenKind::Ident(s) => s.clone(),
            _ => return Err(ParseError::expected(field, "a bank field")),
        };
        match field_name.as_str() {
            "glob" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                glob = Some(ts.expect_str("a glob string")?);
                ts.expect(&TokenKind::Semi)?;
            }
            "strategy" => {
                ts.advance();
                ts.expect(&TokenKind::Eq)?;
                let token = ts.peek();
                let (tag, _) = ts.expect_ident("a pick strategy")?;
                strategy = match tag.as_str() {
                    "uniform" => PickStrategy::Uniform,
                    "weighted" => PickStrategy::Weighted,
                    other => {
                        return Err(ParseError::at(
                            token,
                            format!("unknown pick strategy '{other}'"),
                        ))
                    }
                };
                ts.expect(&TokenKind::Semi)?;
            }
            _ => ts.skip_unknown_field(),
        }
    }
    ts.expect(&TokenKind::RBrace)?;

    let glob = glob.ok_or_else(|| ParseError::at(open, format!("bank '{name}' is missing 'glob'")))?;
    Ok(AssetBank {
        name,
        glob,
        strategy,
    })
}
