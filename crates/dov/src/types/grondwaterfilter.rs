//! Groundwater filters (`grondwaterfilter`) with their water level
//! measurements.

use crate::error::RegistryError;
use crate::field::{ChildType, FieldDescriptor as F, RecordType};

pub const NAME: &str = "grondwaterfilter";
pub const LAYER: &str = "gw_meetnetten:meetnetten";
pub const NAMESPACE: &str = "http://dov.vlaanderen.be/grondwater/gw_meetnetten";

pub fn record_type() -> Result<RecordType, RegistryError> {
    RecordType::builder(NAME, LAYER)
        .namespace(NAMESPACE)
        .description(
            "Een grondwaterfilter is de plaats in een grondwaterput waar het \
             grondwater in contact staat met de put. In een filter worden \
             grondwaterstanden (peilmetingen) opgemeten.",
        )
        .identity("pkey_filter")
        .field(F::listing("pkey_filter", "filterfiche", "string")?.with_definition(
            "URL die verwijst naar de gegevens van de filter. Voeg '.xml' toe om \
             een XML voorstelling van deze gegevens te verkrijgen.",
        ))
        .field(
            F::listing("pkey_grondwaterlocatie", "putfiche", "string")?.with_definition(
                "URL die verwijst naar de gegevens van de grondwaterlocatie (put).",
            ),
        )
        .field(F::listing("gw_id", "GW_ID", "string")?.with_definition(
            "Identificatie van de grondwaterlocatie.",
        ))
        .field(F::listing("filternummer", "filternummer", "string")?.with_definition(
            "Nummer van de filter binnen de grondwaterlocatie.",
        ))
        .field(F::listing("filtertype", "filtertype", "string")?.with_definition(
            "Type van de filter (peilfilter, pompfilter, ...).",
        ))
        .field(F::listing("x", "X_mL72", "float")?.with_definition(
            "X-coördinaat in Lambert72 (EPSG:31370).",
        ))
        .field(F::listing("y", "Y_mL72", "float")?.with_definition(
            "Y-coördinaat in Lambert72 (EPSG:31370).",
        ))
        .field(
            F::listing("start_grondwaterlocatie_mtaw", "Z_mTAW", "float")?
                .with_definition("Hoogte in mTAW van het startpunt van de grondwaterlocatie."),
        )
        .field(
            F::detail(
                "mv_mtaw",
                "/grondwaterlocatie/puntligging/oorspronkelijk_maaiveld/waarde",
                "float",
            )?
            .with_definition("Maaiveldhoogte in mTAW."),
        )
        .field(F::listing("gemeente", "gemeente", "string")?.with_definition(
            "Gemeente waarin de grondwaterlocatie zich bevindt.",
        ))
        .field(F::detail("meetnet_code", "/filter/meetnet", "string")?.with_definition(
            "Code van het meetnet waartoe de filter behoort.",
        ))
        .field(F::detail("aquifer_code", "/filter/ligging/aquifer", "string")?.with_definition(
            "Code van de watervoerende laag waarin de filter hangt.",
        ))
        .field(
            F::detail(
                "grondwaterlichaam_code",
                "/filter/ligging/grondwaterlichaam",
                "string",
            )?
            .with_definition("Code van het grondwaterlichaam."),
        )
        .field(F::detail("regime", "/filter/ligging/regime", "string")?.with_definition(
            "Regime van de watervoerende laag (freatisch, gespannen, ...).",
        ))
        .field(
            F::listing("diepte_onderkant_filter", "onderkant_filter_m", "float")?
                .with_definition("Diepte van de onderkant van de filter in meter."),
        )
        .field(F::listing("lengte_filter", "lengte_filter_m", "float")?.with_definition(
            "Lengte van de filter in meter.",
        ))
        .child(
            ChildType::new("peilmeting", ".//filtermeting/peilmeting")?
                .with_field(F::detail("datum", "/datum", "date")?.with_definition(
                    "Datum waarop de meting werd uitgevoerd.",
                ))
                .with_field(F::detail("tijdstip", "/tijdstip", "string")?.with_definition(
                    "Tijdstip waarop de meting werd uitgevoerd (indien beschikbaar).",
                ))
                .with_field(F::detail("peil_mtaw", "/filterpeil/peil", "float")?.with_definition(
                    "Diepte van de gemeten grondwaterstand in mTAW.",
                ))
                .with_field(
                    F::detail("betrouwbaarheid", "/filterpeil/betrouwbaarheid", "string")?
                        .with_definition("Betrouwbaarheid van de meting (goed, onbekend, twijfelachtig)."),
                )
                .with_field(F::detail("methode", "/filterpeil/methode", "string")?.with_definition(
                    "Methode waarop de meting werd uitgevoerd.",
                )),
        )
        .child(
            ChildType::new("filterstatus_meting", ".//filtermeting/filterstatus")?
                .with_field(F::detail("filterstatus", "/status", "string")?.with_definition(
                    "Status van de filter tijdens de meting (in rust, in werking).",
                ))
                .with_field(F::detail("filtertoestand", "/toestand", "integer")?.with_definition(
                    "Toestand van de filter bij de meting: 1 normaal, 2 geboorde put \
                     beschadigd, 3 filter beschadigd, 4 verstopt.",
                )),
        )
        .build()
}
