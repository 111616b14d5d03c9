//! Render IR compilation: stable ids, resolution, hashing, determinism.

use folio_ast::Value;
use folio_parser::parse_source;
use folio_render::{render, AssetResolver, RenderOptions};
use folio_runtime::{init_runtime_state, run_docstep_once};

fn doc(src: &str) -> folio_ast::Document {
    parse_source(src).unwrap()
}

#[test]
fn node_ids_derive_from_the_path() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          body {
            page p1 {
              text t1 { text = "hi"; }
              text t2 { text = "yo"; }
            }
          }
        }
        "#,
    );
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 0)).unwrap();
    assert_eq!(ir.body.len(), 1);
    let page = &ir.body[0];
    assert_eq!(page.node_id, "page:p1:0");
    assert_eq!(page.children[0].node_id, "page:p1:0/text:t1:0");
    assert_eq!(page.children[1].node_id, "page:p1:0/text:t2:1");
}

#[test]
fn dynamic_props_resolve_against_the_context() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          state { param n { type = int; initial = 4; } }
          body {
            text t { value = @n * 2 + docstep; }
          }
        }
        "#,
    );
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 3)).unwrap();
    assert_eq!(ir.body[0].props["value"], Value::Int(11));
}

#[test]
fn runtime_snapshot_overrides_initial_params() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          state { param n { type = int; initial = 0; } }
          rule tick { when true then { n = n + 1; } }
          body {
            text t { value = @n; }
          }
        }
        "#,
    );
    let s0 = init_runtime_state(&doc, 1).unwrap();
    let s1 = run_docstep_once(&doc, &s0).unwrap();
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 0).with_runtime(&s1)).unwrap();
    assert_eq!(ir.docstep, 1);
    assert_eq!(ir.body[0].props["value"], Value::Int(1));
}

#[test]
fn invisible_nodes_drop_out() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          state { param show { type = bool; initial = false; } }
          body {
            text a { visibleIf = @show; text = "hidden"; }
            text b { text = "shown"; }
          }
        }
        "#,
    );
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 0)).unwrap();
    assert_eq!(ir.body.len(), 1);
    assert_eq!(ir.body[0].id, "b");
}

#[test]
fn slot_hashes_track_resolved_content() {
    let src = |text: &str| {
        format!(
            r#"
            document {{
              meta {{ version = "1"; }}
              body {{
                page p {{
                  slot s {{ reserve = fixed(100, 20, pt); text = "{text}"; }}
                }}
              }}
            }}
            "#
        )
    };
    let doc_a = doc(&src("one"));
    let doc_b = doc(&src("one"));
    let doc_c = doc(&src("two"));

    let opts = RenderOptions::new(1, 0.0, 0);
    let a = render(&doc_a, &opts).unwrap();
    let b = render(&doc_b, &opts).unwrap();
    let c = render(&doc_c, &opts).unwrap();

    let key = "page:p:0/slot:s:0";
    assert_eq!(a.slot_meta[key].value_hash, b.slot_meta[key].value_hash);
    assert_ne!(a.slot_meta[key].value_hash, c.slot_meta[key].value_hash);
    // Non-slot nodes publish no slot meta.
    assert_eq!(a.slot_meta.len(), 1);
}

#[test]
fn grid_nodes_resolve_static_cells_without_runtime() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          grid field {
            rows = 2;
            cols = 2;
            cell a { content = "*"; dynamic = 2.0; }
            cell b { dynamic = 0.5; }
          }
          body {
            grid field { }
          }
        }
        "#,
    );
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 0)).unwrap();
    let grid = ir.body[0].grid.as_ref().unwrap();
    assert_eq!((grid.rows, grid.cols), (2, 2));
    assert_eq!(grid.cells.len(), 4);
    assert_eq!(grid.cells[0].content, "*");
    // density clamps, salience is relative to the max.
    assert_eq!(grid.cells[0].density, 1.0);
    assert_eq!(grid.cells[0].salience, 1.0);
    assert_eq!(grid.cells[1].density, 0.5);
    assert_eq!(grid.cells[1].salience, 0.25);
    // Padded blanks carry zeroes.
    assert_eq!(grid.cells[3].id, "r1c1");
    assert_eq!(grid.cells[3].salience, 0.0);
}

#[test]
fn grid_nodes_prefer_the_runtime_snapshot() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          grid field {
            rows = 1;
            cols = 2;
            cell a { dynamic = 0.0; }
            cell b { dynamic = 1.0; }
          }
          rule spread(grid=field) {
            when true then { cell.dynamic = neighbors.orth(); }
          }
          body {
            grid field { }
          }
        }
        "#,
    );
    let s0 = init_runtime_state(&doc, 1).unwrap();
    let s1 = run_docstep_once(&doc, &s0).unwrap();
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 0).with_runtime(&s1)).unwrap();
    let grid = ir.body[0].grid.as_ref().unwrap();
    assert_eq!(grid.cells[0].dynamic, 1.0);
    assert_eq!(grid.cells[1].dynamic, 0.0);
}

#[test]
fn asset_picks_are_seed_deterministic() {
    let src = r#"
        document {
          meta { version = "1"; }
          assets {
            asset a { tags = [mask]; file = "a.png"; weight = 1.0; }
            asset b { tags = [mask]; file = "b.png"; weight = 3.0; }
            asset c { tags = [other]; file = "c.png"; }
          }
          body {
            image i { src = @assets.pick(tags = [mask]); }
          }
        }
        "#;
    let doc_a = doc(src);

    let first = render(&doc_a, &RenderOptions::new(7, 0.0, 0)).unwrap();
    let again = render(&doc_a, &RenderOptions::new(7, 0.0, 0)).unwrap();
    assert_eq!(first.body[0].props["src"], again.body[0].props["src"]);

    // Only tag-matching entries are candidates.
    let Value::Str(picked) = &first.body[0].props["src"] else {
        panic!("expected a string pick");
    };
    assert!(picked == "a.png" || picked == "b.png");

    // The binding is recorded for the viewer.
    assert_eq!(first.assets.len(), 1);
    assert_eq!(first.assets[0].node_id, "image:i:0");
    assert_eq!(first.assets[0].prop, "src");
    assert_eq!(first.assets[0].value, *picked);
}

#[test]
fn materials_join_the_pick_catalog() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          assets {
            asset grain { tags = [paper]; file = "paper/grain.png"; }
          }
          materials {
            material ink { tags = [wash]; file = "materials/ink.png"; }
          }
          body {
            image i { src = @assets.pick(tags = [wash]); }
          }
        }
        "#,
    );
    // Only the material carries the requested tag.
    let ir = render(&doc, &RenderOptions::new(5, 0.0, 0)).unwrap();
    assert_eq!(
        ir.body[0].props["src"],
        Value::Str("materials/ink.png".into())
    );
}

struct FixedBank;

impl AssetResolver for FixedBank {
    fn enumerate(&self, glob: &str) -> Vec<String> {
        assert_eq!(glob, "tex/*.png");
        vec!["tex/1.png".into(), "tex/2.png".into(), "tex/3.png".into()]
    }
}

#[test]
fn bank_picks_enumerate_through_the_resolver() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          assets {
            bank textures { glob = "tex/*.png"; strategy = uniform; }
          }
          body {
            image i { src = @assets.pick(bank = "textures"); }
          }
        }
        "#,
    );
    let opts = RenderOptions::new(3, 0.0, 0).with_assets(&FixedBank);
    let ir = render(&doc, &opts).unwrap();
    let Value::Str(picked) = &ir.body[0].props["src"] else {
        panic!("expected a string pick");
    };
    assert!(picked.starts_with("tex/"));
}

#[test]
fn ref_resolves_to_the_labeled_nodes_text() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          body {
            text intro { label = "opening"; text = "Once upon a docstep"; }
            text cite { quote = @ref("opening"); }
            text bare { label = "anchor"; }
            text link { target = @ref("anchor"); }
          }
        }
        "#,
    );
    let ir = render(&doc, &RenderOptions::new(1, 0.0, 0)).unwrap();
    assert_eq!(
        ir.body[1].props["quote"],
        Value::Str("Once upon a docstep".into())
    );
    // A labeled node without literal text resolves to its id.
    assert_eq!(ir.body[3].props["target"], Value::Str("bare".into()));
}

#[test]
fn ir_json_shape_is_camel_case() {
    let doc = doc(
        r#"
        document {
          meta { version = "1"; }
          pageConfig { width = 595; height = 842; }
          body {
            page p {
              inline_slot s { text = "x"; }
            }
          }
        }
        "#,
    );
    let ir = render(&doc, &RenderOptions::new(9, 250.0, 2)).unwrap();
    let json = serde_json::to_value(&ir).unwrap();
    assert_eq!(json["seed"], 9);
    assert_eq!(json["time"], 250.0);
    assert_eq!(json["docstep"], 2);
    assert_eq!(json["pageConfig"]["width"], 595.0);
    assert_eq!(json["body"][0]["nodeId"], "page:p:0");
    let slot_id = "page:p:0/inline_slot:s:0";
    assert!(json["slotMeta"][slot_id]["valueHash"].is_string());
}
