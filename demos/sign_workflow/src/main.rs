//! Sign Workflow Example
//!
//! Builds a small wayfinding project, runs signs through the save pipeline
//! and persists the result.
//!
//! ```text
//! cargo run -p sign_workflow -- [config.ron] [signs.db]
//! ```
//!
//! Artwork generation needs the rendering service from the config; without
//! it the jobs report failures and the PNG endpoints serve the placeholder.
//! Set `RUST_LOG=debug` to follow the pipeline steps.

use signage_core::{
    Attribute, AttributeGroup, AttributeId, Group, GroupId, NumberingMode, Phase, PhaseId,
    Position, PositionId, Project, ProjectId, Registry, SignTemplate, State, StateId, Tag, TagId,
    TemplateAttribute, TemplateId, Workflow, WorkflowId, Zone, ZoneId,
};
use signage_db::Store;
use signage_hub::{Hub, HubConfig};
use signage_render::HttpRenderService;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "demos/sign_workflow/config/hub.ron";
const DEFAULT_DB: &str = "sign_workflow.db";

struct Site {
    registry: Registry,
    lobby: ZoneId,
    lobby_door: PositionId,
    room_id: TemplateId,
    concept: StateId,
    approved: StateId,
    urgent: TagId,
}

fn site() -> Result<Site, signage_core::Error> {
    let mut registry = Registry::new();

    let project = ProjectId::new(registry.allocate());
    let mut p = Project::new(project, "City Library");
    p.numbering = NumberingMode::ByTypeLocation;
    registry.insert_project(p);

    let building = ZoneId::new(registry.allocate());
    let mut b = Zone::new(building, project, "Main Building");
    b.short_code = "M".into();
    registry.insert_zone(b);
    let lobby = ZoneId::new(registry.allocate());
    let mut l = Zone::new(lobby, project, "Lobby");
    l.parent = Some(building);
    l.short_code = "L1".into();
    l.attributes.insert("level".into(), "Ground Floor".into());
    registry.insert_zone(l);

    let lobby_door = PositionId::new(registry.allocate());
    registry.save_position(Position::new(lobby_door, lobby, 51.5072, -0.1276))?;

    let mut attribute = |slug: &str, name: &str, group: AttributeGroup, inheritable: bool| {
        let id = AttributeId::new(registry.allocate());
        let mut a = Attribute::new(id, slug, name);
        a.group = group;
        a.is_inheritable = inheritable;
        registry.insert_attribute(a);
        TemplateAttribute {
            attribute: id,
            is_repeating: false,
        }
    };
    let room_name = attribute("room_name", "Room Name", AttributeGroup::Message, false);
    let level = attribute("level", "Level", AttributeGroup::Message, true);
    let material = attribute("material", "Material", AttributeGroup::Meta, false);

    let room_id = TemplateId::new(registry.allocate());
    let mut t = SignTemplate::new(room_id, project, "Room ID");
    t.short_code = "RID".into();
    t.svg_code = Some(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"600\" height=\"200\">\
         <text x=\"20\" y=\"80\">{room_name}</text>\
         <text x=\"20\" y=\"150\">{level} / {sign_id}</text></svg>"
            .into(),
    );
    t.attributes = vec![room_name, level, material];
    registry.insert_template(t);

    let mut group = |name: &str| {
        let id = GroupId::new(registry.allocate());
        registry.insert_group(Group {
            id,
            name: name.into(),
        });
        id
    };
    let designers = group("Designers");
    let client = group("Client");
    let fabricator = group("Fabricator");

    let workflow = WorkflowId::new(registry.allocate());
    registry.insert_workflow(Workflow {
        id: workflow,
        project,
        name: "Design to Install".into(),
        order: 1,
    });
    let design = PhaseId::new(registry.allocate());
    registry.insert_phase(Phase {
        id: design,
        project,
        name: "Design".into(),
        order: 1,
        member_group: designers,
        viewer_group: client,
        zones: Default::default(),
        templates: Default::default(),
    });
    let concept = StateId::new(registry.allocate());
    registry.insert_state(State {
        id: concept,
        workflow,
        phase: design,
        name: "Concept".into(),
        order: 1,
        viewer_group: client,
    });
    let approved = StateId::new(registry.allocate());
    registry.insert_state(State {
        id: approved,
        workflow,
        phase: design,
        name: "Approved for fabrication".into(),
        order: 2,
        viewer_group: fabricator,
    });

    let urgent = TagId::new(registry.allocate());
    registry.insert_tag(Tag {
        id: urgent,
        tag: "urgent".into(),
    });

    Ok(Site {
        registry,
        lobby,
        lobby_door,
        room_id,
        concept,
        approved,
        urgent,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let db_path = args.next().unwrap_or_else(|| DEFAULT_DB.to_string());

    let config = HubConfig::load(&config_path)?;
    tracing::info!(config = %config_path, service = %config.render.service_url, "Loaded config");

    let site = site()?;
    let service = HttpRenderService::new(&config.render)?;
    let hub = Hub::with_registry(service, &config, site.registry, Default::default())?;

    println!("=== Sign Workflow Example ===\n");

    // Two signs that share a number in the same zone and template
    let mut jobs = Vec::new();
    let mut ids = Vec::new();
    for room in ["Reading Room", "Study Room"] {
        let number = hub
            .next_number(site.lobby, Some(site.room_id))
            .await?
            .unwrap_or_default();
        let mut sign = hub.create_sign(site.lobby_door).await?;
        sign.template = Some(site.room_id);
        sign.state = Some(site.concept);
        sign.number = if ids.is_empty() { number } else { "1".into() };
        sign.set_value("room_name", room);
        sign.set_value("material", "Brushed aluminium");
        let report = hub.save_sign(sign).await?;
        println!(
            "Saved {} (created: {}, conflicts touched: {})",
            hub.label(report.sign.id).await?,
            report.created,
            report.conflicts_touched.len()
        );
        ids.push(report.sign.id);
        jobs.push(report.artwork_job);
    }

    let highlights = hub.highlights(ids[1]).await?;
    println!("Duplicate highlight on second sign: {:?}", highlights);

    // Renumber to clear the clash, then approve
    let registry = hub.registry();
    let mut second = registry.read().await.require_sign(ids[1])?.clone();
    second.number = hub
        .next_number(site.lobby, Some(site.room_id))
        .await?
        .unwrap_or_default();
    second.state = Some(site.approved);
    let report = hub.save_sign(second).await?;
    println!(
        "Renumbered to {} (review: {:?})",
        hub.label(report.sign.id).await?,
        report.sign.review_state
    );
    jobs.push(report.artwork_job);

    hub.set_tags(ids[0], vec![site.urgent]).await?;
    let copy = hub.clone_sign(ids[0]).await?;
    println!("Cloned into {}", hub.label(copy.sign.id).await?);
    jobs.push(copy.artwork_job);

    let removed = hub.delete_sign(copy.sign.id).await?;
    println!("Deleted clone {}", removed.number);

    println!("\nSnapshot of the first sign:");
    for (key, value) in hub.snapshot(ids[0]).await? {
        println!("  {}: {}", key, value);
    }
    println!("\nMessage HTML:\n{}", hub.message_html(ids[0]).await?);

    for job in jobs {
        let report = job.await?;
        println!(
            "Artwork job: {} generated, {} skipped, {} failed",
            report.generated.len(),
            report.skipped.len(),
            report.failed.len()
        );
    }

    let store = Store::open(&db_path)?;
    store.save_registry(&*registry.read().await)?;
    store.save_grants(&*hub.grants().read().await)?;
    println!(
        "\nSaved {} signs and {} grants to {}",
        store.sign_count()?,
        store.load_grants()?.len(),
        db_path
    );

    let reloaded = store.load_registry()?;
    let lobby_signs = store.signs_in_zone(site.lobby)?;
    println!(
        "Reloaded {} signs, {} in the lobby",
        reloaded.sign_count(),
        lobby_signs.len()
    );

    Ok(())
}
