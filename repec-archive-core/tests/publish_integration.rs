use std::fs;
use std::path::Path;

use repec_archive_core::archive::ArchiveFile;
use repec_archive_core::builder::AlterHooks;
use repec_archive_core::bundle::BundleMapping;
use repec_archive_core::contract::{
    ContentEntity, EntityRecord, FieldItem, FileRecord, MockReferenceLoader, UserRecord,
};
use repec_archive_core::error::RepecError;
use repec_archive_core::publish::Publisher;
use repec_archive_core::series::SeriesType;
use repec_archive_core::settings::ArchiveSettings;
use repec_archive_core::store::MemoryConfigStore;
use repec_archive_core::template::AttributePair;
use tempfile::tempdir;

fn settings(public_dir: &Path) -> ArchiveSettings {
    ArchiveSettings {
        public_dir: public_dir.to_path_buf(),
        public_url_path: "/files/".to_string(),
        base_path: "repec".to_string(),
        archive_code: "tst".to_string(),
        provider_name: "Test Institute".to_string(),
        provider_homepage: "https://example.org".to_string(),
        provider_institution: "RePEc:edi:tstinus".to_string(),
        maintainer_name: "Jo Maintainer".to_string(),
        maintainer_email: "jo@example.org".to_string(),
    }
}

fn paper_mapping() -> BundleMapping {
    BundleMapping {
        enabled: true,
        serie_type: Some(SeriesType::WorkingPaper),
        serie_name: "Working Papers".to_string(),
        is_different_serie_directory: false,
        author_name: "field_authors".to_string(),
        abstract_field: "body".to_string(),
        creation_date: "created".to_string(),
        file_url: "field_files".to_string(),
        keywords: "field_tags".to_string(),
        ..BundleMapping::default()
    }
}

fn paper() -> EntityRecord {
    EntityRecord::new("node", "paper", 42, "Growth and Trade")
        .with_field("field_authors", vec![FieldItem::target(7)])
        .with_field("body", vec![FieldItem::value("<p>Test</p>")])
        .with_field("created", vec![FieldItem::value("0")])
        .with_field("field_files", vec![FieldItem::target(3)])
        .with_field("field_tags", vec![])
}

fn paper_loader() -> MockReferenceLoader {
    let mut loader = MockReferenceLoader::new();
    loader.expect_load_users().returning(|_| {
        Ok(vec![UserRecord {
            id: 7,
            name: "Jane Doe".to_string(),
        }])
    });
    loader.expect_load_files().returning(|_| {
        Ok(vec![FileRecord {
            id: 3,
            uri: "public://papers/growth and trade.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        }])
    });
    loader
}

fn publisher(
    public_dir: &Path,
    loader: MockReferenceLoader,
    mapping: &BundleMapping,
) -> Publisher<MockReferenceLoader, MemoryConfigStore> {
    let publisher = Publisher::new(settings(public_dir), loader, MemoryConfigStore::new());
    publisher
        .bundles()
        .set_mapping(mapping, "node", "paper")
        .expect("bundle mapping stored");
    publisher
}

#[test]
fn test_publish_working_paper_end_to_end() {
    let public = tempdir().unwrap();
    let publisher = publisher(public.path(), paper_loader(), &paper_mapping());

    let init = publisher.initialize_archive();
    assert!(init.is_clean(), "warnings: {:?}", init.warnings);

    let report = publisher.publish_entity(&paper());
    assert!(report.is_clean(), "warnings: {:?}", report.warnings);

    let entity_path = public
        .path()
        .join("repec/tst/wpaper/wpaper_node_42.rdf");
    assert_eq!(report.written, vec![entity_path.clone()]);
    assert_eq!(
        fs::read_to_string(&entity_path).unwrap(),
        "Template-Type: ReDIF-Paper 1.0\n\
         Title: Growth and Trade\n\
         Handle: RePEc:tst:wpaper:42\n\
         Author-Name: Jane Doe\n\
         Abstract: Test\n\
         Creation-Date: 1970-01-01\n\
         File-URL: https://example.org/files/papers/growth%20and%20trade.pdf\n\
         File-Format: Application/Pdf\n\
         Keywords: \n"
    );

    let index = fs::read_to_string(publisher.writer().path_for(&ArchiveFile::Series)).unwrap();
    assert_eq!(
        index,
        "Template-Type: ReDIF-Series 1.0\n\
         Name: Working Papers\n\
         Provider-Name: Test Institute\n\
         Provider-Homepage: https://example.org\n\
         Provider-Institution: RePEc:edi:tstinus\n\
         Maintainer-Name: Jo Maintainer\n\
         Maintainer-Email: jo@example.org\n\
         Type: ReDIF-Paper\n\
         Handle: RePEc:tst:wpaper\n\n"
    );

    // Updating rewrites the entity file and leaves the index alone.
    let update = publisher.update_entity_template(&paper());
    assert!(update.is_clean());
    assert!(update.appended.is_empty());
    let index_again =
        fs::read_to_string(publisher.writer().path_for(&ArchiveFile::Series)).unwrap();
    assert_eq!(index, index_again);

    let delete = publisher.delete_entity_template(&paper());
    assert_eq!(delete.removed, vec![entity_path.clone()]);
    assert!(!entity_path.exists());
}

#[test]
fn test_delete_with_empty_serie_directory_deletes_nothing() {
    let public = tempdir().unwrap();
    let mapping = BundleMapping {
        is_different_serie_directory: true,
        serie_directory: String::new(),
        ..paper_mapping()
    };
    let publisher = publisher(public.path(), MockReferenceLoader::new(), &mapping);

    let bystander = publisher
        .writer()
        .directory()
        .join("wpaper/wpaper_node_42.rdf");
    fs::create_dir_all(bystander.parent().unwrap()).unwrap();
    fs::write(&bystander, "Title: keep\n").unwrap();

    let report = publisher.delete_entity_template(&paper());
    assert!(report.removed.is_empty());
    assert!(matches!(
        report.warnings.as_slice(),
        [RepecError::EmptyDirectory { .. }]
    ));
    assert!(bystander.exists());
}

#[test]
fn test_hooks_run_generic_first_then_per_series() {
    let public = tempdir().unwrap();
    let mut hooks = AlterHooks::new();
    hooks.register_for(SeriesType::WorkingPaper, |template, _| {
        template.push("Note", "series");
    });
    hooks.register(|template, entity| {
        template.push("Note", format!("generic {}", entity.id()));
    });
    hooks.register_for(SeriesType::Book, |template, _| {
        template.push("Note", "book only");
    });
    hooks.register(|template, _| {
        template.pairs_mut().retain(|p| p.attribute != "Keywords");
    });

    let publisher =
        publisher(public.path(), paper_loader(), &paper_mapping()).with_hooks(hooks);
    let template = publisher
        .entity_template(&paper())
        .value
        .expect("template for a configured bundle");

    let notes: Vec<&str> = template
        .pairs()
        .iter()
        .filter(|p| p.attribute == "Note")
        .map(|p| p.value.as_str())
        .collect();
    assert_eq!(notes, vec!["generic 42", "series"]);
    assert_eq!(template.value_of("Keywords"), None);
}

#[test]
fn test_book_template_places_provider_name_after_authors() {
    let public = tempdir().unwrap();
    let mapping = BundleMapping {
        serie_type: Some(SeriesType::Book),
        serie_name: "Books".to_string(),
        provider_name: "field_publisher".to_string(),
        ..paper_mapping()
    };
    let publisher = publisher(public.path(), paper_loader(), &mapping);
    let book = paper().with_field("field_publisher", vec![FieldItem::value("Acme Press")]);

    let template = publisher.entity_template(&book).value.unwrap();
    let attributes: Vec<&str> = template
        .pairs()
        .iter()
        .map(|p| p.attribute.as_str())
        .collect();
    assert_eq!(
        attributes,
        vec![
            "Template-Type",
            "Title",
            "Handle",
            "Author-Name",
            "Provider-Name",
            "Abstract",
            "Creation-Date",
            "File-URL",
            "File-Format",
            "Keywords",
        ]
    );
    assert_eq!(template.value_of("Template-Type"), Some("ReDIF-Book 1.0"));
    assert_eq!(template.value_of("Handle"), Some("RePEc:tst:bookss:42"));
    assert_eq!(template.value_of("Provider-Name"), Some("Acme Press"));
}

#[test]
fn test_software_template_uses_name_attribute() {
    let public = tempdir().unwrap();
    let mapping = BundleMapping {
        serie_type: Some(SeriesType::SoftwareComponent),
        ..paper_mapping()
    };
    let publisher = publisher(public.path(), paper_loader(), &mapping);

    let template = publisher.entity_template(&paper()).value.unwrap();
    assert_eq!(
        template.pairs()[..2],
        [
            AttributePair::new("Template-Type", "ReDIF-Software 1.0"),
            AttributePair::new("Name", "Growth and Trade"),
        ]
    );
}

#[test]
fn test_series_failure_does_not_block_entity_file() {
    let public = tempdir().unwrap();
    let publisher = publisher(public.path(), paper_loader(), &paper_mapping());
    fs::create_dir_all(publisher.writer().path_for(&ArchiveFile::Series)).unwrap();

    let report = publisher.create_entity_template(&paper());
    assert!(report.appended.is_empty());
    assert!(matches!(
        report.warnings.as_slice(),
        [RepecError::ReadIndex { .. }]
    ));
    assert_eq!(report.written.len(), 1);
    assert!(report.written[0].exists());
}

#[test]
fn test_disabled_or_restricted_entities_are_skipped() {
    let public = tempdir().unwrap();
    let disabled = BundleMapping {
        enabled: false,
        ..paper_mapping()
    };
    let publisher = publisher(public.path(), MockReferenceLoader::new(), &disabled);
    let report = publisher.publish_entity(&paper());
    assert!(report.is_clean());
    assert!(report.written.is_empty());

    let restricted = BundleMapping {
        restriction_by_field: true,
        restriction_field: "field_share".to_string(),
        ..paper_mapping()
    };
    publisher
        .bundles()
        .set_mapping(&restricted, "node", "paper")
        .unwrap();

    let hidden = paper().with_field("field_share", vec![FieldItem::value("0")]);
    assert!(!publisher.is_entity_shareable(&hidden).unwrap());
    assert!(publisher.publish_entity(&hidden).written.is_empty());

    let shared = paper().with_field("field_share", vec![FieldItem::value("1")]);
    assert!(publisher.is_entity_shareable(&shared).unwrap());
}

#[test]
fn test_bundle_without_series_type_yields_no_template() {
    let public = tempdir().unwrap();
    let mapping = BundleMapping {
        serie_type: None,
        ..paper_mapping()
    };
    let publisher = publisher(public.path(), MockReferenceLoader::new(), &mapping);

    let outcome = publisher.entity_template(&paper());
    assert!(outcome.value.is_none());
    assert!(matches!(
        outcome.warnings.as_slice(),
        [RepecError::MissingSeriesType { .. }]
    ));

    let report = publisher.create_entity_template(&paper());
    assert!(report.written.is_empty());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_available_series_lists_every_type() {
    let series = Publisher::<MockReferenceLoader, MemoryConfigStore>::available_series();
    let codes: Vec<&str> = series.iter().map(|(s, _)| s.code()).collect();
    assert_eq!(codes, vec!["wpaper", "journl", "bookss", "chaptr", "sftwre"]);
    assert_eq!(series[0].1, "Paper series");
}
