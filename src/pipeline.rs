//! The update run: preflight, reference inputs, countries, publish.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

use crate::boundaries::{Boundaries, CountryOutcome};
use crate::catalog::CatalogClient;
use crate::config::ProjectConfig;
use crate::countries::{fetch_countries, select_countries};
use crate::models::AdminLevel;

/// Countries and levels selected for a run
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Requested ISO3 codes; every listed country when `None`.
    /// Named countries without a boundary dataset fail the run.
    pub countries: Option<Vec<String>>,
    pub levels: Vec<AdminLevel>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Run a full update against the catalog.
///
/// Credentials are checked before anything is downloaded, so a rejected key
/// never reaches the upload step.
pub async fn run_update(
    client: &CatalogClient,
    config: &ProjectConfig,
    plan: &RunPlan,
    temp_folder: &Path,
) -> Result<RunSummary> {
    config.validate_levels(&plan.levels)?;

    client
        .check_credentials()
        .await
        .context("Catalog rejected the configured credentials")?;

    let all_countries = fetch_countries(client, &config.countries, temp_folder).await?;
    let countries = select_countries(&all_countries, plan.countries.as_deref())?;
    let strict = plan.countries.is_some();
    info!(
        "Processing {} countries at {:?}",
        countries.len(),
        plan.levels
    );

    let mut boundaries = Boundaries::new(client, config, temp_folder);
    boundaries.download_boundary_inputs(&plan.levels).await?;

    let pb = ProgressBar::new(countries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut summary = RunSummary::default();
    for country in &countries {
        pb.set_message(country.iso3.clone());
        match boundaries
            .update_subnational_boundaries(country, &plan.levels, strict)
            .await?
        {
            CountryOutcome::Processed(_) => summary.processed += 1,
            CountryOutcome::Skipped => summary.skipped += 1,
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    boundaries.update_subnational_resources(&plan.levels).await?;

    info!(
        "Finished processing! {} countries processed, {} skipped",
        summary.processed, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_client;
    use crate::config::SAMPLE_CONFIG;
    use crate::layer::{read_geojson, write_adm1_shapefile};
    use geo::{Area, Contains, Geometry};
    use serde_json::json;
    use std::io::{Cursor, Write};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zip::write::SimpleFileOptions;

    const ADM0: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"ISO_3": "SOM"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
        {"type": "Feature", "properties": {"ISO_3": "ABC"},
         "geometry": {"type": "Polygon", "coordinates": [[[20,0],[30,0],[30,10],[20,10],[20,0]]]}}
    ]}"#;
    const EMPTY: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    // Published adm1 layers before the run: one unit of another country and
    // one outdated unit of the updated country
    const ADM1_POLYGONS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"alpha_3": "SOM", "ADM0_REF": "Somalia", "ADM1_PCODE": "SO99", "ADM1_REF": "Old"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
        {"type": "Feature", "properties": {"alpha_3": "ABC", "ADM0_REF": "Abc", "ADM1_PCODE": "AB01", "ADM1_REF": "North"},
         "geometry": {"type": "Polygon", "coordinates": [[[20,0],[30,0],[30,10],[20,10],[20,0]]]}}
    ]}"#;
    const ADM1_POINTS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"alpha_3": "SOM", "ADM0_REF": "Somalia", "ADM1_PCODE": "SO99", "ADM1_REF": "Old"},
         "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}}
    ]}"#;

    fn reference_dataset(server: &MockServer) -> serde_json::Value {
        let resource = |name: &str| {
            json!({"id": format!("id-{}", name), "name": name, "format": "GeoJSON",
                   "url": format!("{}/files/{}", server.uri(), name)})
        };
        json!({"success": true, "result": {
            "id": "un", "name": "unmap-international-boundaries-geojson",
            "resources": [
                resource("wrl_polbnda_int_1m_uncs.geojson"),
                resource("wrl_lakes_uncs.geojson"),
                resource("polbnda_adm1_1m_ocha.geojson"),
                resource("polbndp_adm1_1m_ocha.geojson"),
                resource("polbnda_adm2_1m_ocha.geojson"),
                resource("polbndp_adm2_1m_ocha.geojson"),
                resource("unrelated.csv")
            ]
        }})
    }

    async fn mount_file(server: &MockServer, name: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/files/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_reference(server: &MockServer, adm1_polygons: &str, adm1_points: &str) {
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .and(query_param("id", "unmap-international-boundaries-geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reference_dataset(server)))
            .mount(server)
            .await;
        mount_file(server, "wrl_polbnda_int_1m_uncs.geojson", ADM0).await;
        mount_file(server, "wrl_lakes_uncs.geojson", EMPTY).await;
        mount_file(server, "polbnda_adm1_1m_ocha.geojson", adm1_polygons).await;
        mount_file(server, "polbndp_adm1_1m_ocha.geojson", adm1_points).await;
    }

    async fn mount_organizations(server: &MockServer, organizations: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/3/action/organization_list_for_user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "result": organizations})),
            )
            .mount(server)
            .await;
    }

    async fn mount_uploads(server: &MockServer, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/api/3/action/resource_update"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"id": "x", "name": "x", "format": "GeoJSON", "url": ""}
            })))
            .expect(expected)
            .mount(server)
            .await;
    }

    /// Zipped adm1 shapefile with a unit overhanging the national boundary
    fn zipped_adm1_shapefile() -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("som_admbnda_adm1_ocha.shp");
        write_adm1_shapefile(
            &shp,
            &[
                ("SO01", "West", [0.0, 0.0, 5.0, 10.0]),
                ("SO02", "East", [5.0, 0.0, 11.0, 10.0]),
            ],
        );

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for extension in ["shp", "shx", "dbf"] {
            let file = shp.with_extension(extension);
            let name = format!("som_adm_ocha/{}", file.file_name().unwrap().to_string_lossy());
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(&std::fs::read(&file).unwrap()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn plan() -> RunPlan {
        RunPlan {
            countries: Some(Vec::new()),
            levels: vec![AdminLevel::Adm1],
        }
    }

    fn pcodes(layer: &crate::models::BoundaryLayer) -> Vec<String> {
        layer
            .features
            .iter()
            .filter_map(|f| f.attribute_str("ADM1_PCODE"))
            .collect()
    }

    #[tokio::test]
    async fn test_full_run_updates_polygons_and_points() {
        let server = MockServer::start().await;
        mount_organizations(&server, json!([{"name": "ocha"}])).await;
        mount_reference(&server, ADM1_POLYGONS, ADM1_POINTS).await;
        // adm2 reference layers are not requested and must not be fetched
        Mock::given(method("GET"))
            .and(path("/files/polbnda_adm2_1m_ocha.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .and(query_param("id", "cod-em-som"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": {"__type": "Not Found Error", "message": "Not found"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .and(query_param("id", "cod-ab-som"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"id": "som", "name": "cod-ab-som", "resources": [
                    {"id": "xlsx", "name": "som_adm_ocha.xlsx", "format": "XLSX",
                     "url": format!("{}/files/som_adm_ocha.xlsx", server.uri())},
                    {"id": "shp", "name": "som_adm_ocha_shp.zip", "format": "SHP",
                     "url": format!("{}/files/som_adm_ocha_shp.zip", server.uri())}
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/som_adm_ocha_shp.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zipped_adm1_shapefile()))
            .expect(1)
            .mount(&server)
            .await;
        mount_uploads(&server, 2).await;

        let client = test_client(&server);
        let config = ProjectConfig::from_toml(SAMPLE_CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let plan = RunPlan {
            countries: Some(vec!["som".to_string()]),
            ..plan()
        };

        let summary = run_update(&client, &config, &plan, dir.path()).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                processed: 1,
                skipped: 0
            }
        );

        let polygons = read_geojson(&dir.path().join("polbnda_adm1_1m_ocha.geojson")).unwrap();
        assert_eq!(pcodes(&polygons), vec!["AB01", "SO01", "SO02"]);
        let east = polygons.features[2].polygons().unwrap();
        assert!((east.unsigned_area() - 50.0).abs() < 1e-9);
        assert_eq!(
            polygons.features[1].attribute_str("ADM0_REF").as_deref(),
            Some("Somalia")
        );

        let points = read_geojson(&dir.path().join("polbndp_adm1_1m_ocha.geojson")).unwrap();
        assert_eq!(pcodes(&points), vec!["SO01", "SO02"]);
        for (point, polygon) in points.features.iter().zip(&polygons.features[1..]) {
            let Geometry::Point(p) = point.geometry else {
                panic!("expected a point");
            };
            assert!(polygon.polygons().unwrap().contains(&p));
        }

        let uploads: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == "/api/3/action/resource_update")
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect();
        assert_eq!(uploads.len(), 2);
        assert!(uploads.iter().all(|body| body.contains("SO02") && !body.contains("SO99")));
    }

    #[tokio::test]
    async fn test_run_without_countries_republishes_layers() {
        let server = MockServer::start().await;
        mount_organizations(&server, json!([{"name": "ocha"}])).await;
        mount_reference(&server, EMPTY, EMPTY).await;
        mount_uploads(&server, 2).await;

        let client = test_client(&server);
        let config = ProjectConfig::from_toml(SAMPLE_CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let summary = run_update(&client, &config, &plan(), dir.path()).await.unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(dir.path().join("polbnda_adm1_1m_ocha.geojson").exists());
        assert!(dir.path().join("polbndp_adm1_1m_ocha.geojson").exists());
    }

    #[tokio::test]
    async fn test_invalid_credentials_fail_before_upload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/organization_list_for_user"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "success": false,
                "error": {"__type": "Authorization Error", "message": "Access denied"}
            })))
            .mount(&server)
            .await;
        mount_reference(&server, EMPTY, EMPTY).await;
        mount_uploads(&server, 0).await;

        let client = test_client(&server);
        let config = ProjectConfig::from_toml(SAMPLE_CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = run_update(&client, &config, &plan(), dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_key_without_organizations_fails_before_download() {
        let server = MockServer::start().await;
        mount_organizations(&server, json!([])).await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/wrl_polbnda_int_1m_uncs.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ADM0))
            .expect(0)
            .mount(&server)
            .await;
        mount_uploads(&server, 0).await;

        let client = test_client(&server);
        let config = ProjectConfig::from_toml(SAMPLE_CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = run_update(&client, &config, &plan(), dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_level_is_rejected() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let config = ProjectConfig::from_toml(SAMPLE_CONFIG).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let plan = RunPlan {
            levels: vec![AdminLevel::Adm3],
            ..plan()
        };
        assert!(run_update(&client, &config, &plan, dir.path()).await.is_err());
    }
}
