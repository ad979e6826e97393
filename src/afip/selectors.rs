//! URLs and selectors of the AFIP login, portal and online receipts
//! ("Comprobantes en línea") pages.

use crate::page::ResponseFilter;

pub const LOGIN_URL: &str = "https://auth.afip.gob.ar/contribuyente_/login.xhtml";
pub const PORTAL_URL: &str = "https://portalcf.cloud.afip.gob.ar/portal/app/";
pub const PORTAL_KEEP_ALIVE_URL: &str = "https://portalcf.cloud.afip.gob.ar/portal/api/portal/info";
pub const RECEIPTS_AJAX_URL: &str = "https://serviciosjava2.afip.gob.ar/rcel/jsp/ajax.do";

// Login
pub const USERNAME: &str = r#"input[name="F1:username"]"#;
pub const PASSWORD: &str = r#"input[name="F1:password"]"#;
pub const SUBMIT: &str = "input[type=submit]";
pub const LOGIN_ERROR: &str = r"#F1\:msg";

// Portal
pub const MY_SERVICES_XPATH: &str = "//a//*[contains(text(),'Mis Servicios')]";
pub const ONLINE_RECEIPTS_XPATH: &str = "//h4[contains(text(),'Comprobantes en línea')]";

// Receipts application
pub const BUSINESS_BUTTONS: &str = "input[type=button]";
pub const GENERATE_RECEIPTS: &str = "#btn_gen_cmp";
pub const CONTINUE: &str = r#"input[value="Continuar >"]"#;
pub const SALE_POINT: &str = "select[name=puntoDeVenta]";
pub const RECEIPT_TYPE: &str = "select[name=universoComprobante]";
pub const ISSUE_DATE: &str = "input[name=fechaEmisionComprobante]";
pub const CONTENT_TYPE: &str = "#idconcepto";
pub const BILLED_FROM: &str = "input[name=periodoFacturadoDesde]";
pub const BILLED_TO: &str = "input[name=periodoFacturadoHasta]";
pub const DUE_DATE: &str = "input[name=vencimientoPago]";
pub const IVA_CONDITION: &str = "select[name=idIVAReceptor]";
pub const DOCUMENT_TYPE: &str = "select[name=idTipoDocReceptor]";
pub const DOCUMENT_NUMBER: &str = "input[name=nroDocReceptor]";
pub const LEGAL_NAME: &str = "input[name=razonSocialReceptor]";
pub const ADDRESS_COMBO: &str = "select[name=domicilioReceptorCombo]";
pub const ADDRESS_TEXT: &str = "input[name=domicilioReceptor]";
pub const PAYMENT_METHODS: &str = "input[name=formaDePago]";
pub const ADD_LINE: &str = "input[value='Agregar línea descripción']";
pub const TOTAL: &str = "#imptotal";
pub const GENERATE: &str = "#btngenerar";
pub const RECEIPT_BUTTONS: &str = "#botones_comprobante";
pub const PRINT: &str = "input[value='Imprimir...']";

pub fn business_button(name: &str) -> String {
    let name = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"input[value="{name}"][type=button]"#)
}

pub fn line_description(n: usize) -> String {
    format!("#detalle_descripcion{n}")
}

pub fn line_quantity(n: usize) -> String {
    format!("#detalle_cantidad{n}")
}

pub fn line_price(n: usize) -> String {
    format!("#detalle_precio{n}")
}

/// The reply to the receiver lookup fired when the document number field
/// loses focus. Keep-alive pings hit the same endpoint and are not it.
pub const RECEIVER_LOOKUP: ResponseFilter = ResponseFilter {
    name: "receiver lookup",
    matches: is_receiver_lookup,
};

pub fn is_receiver_lookup(url: &str) -> bool {
    url.split_once('?').is_some_and(|(base, query)| {
        base == RECEIPTS_AJAX_URL && !query.split('&').any(|param| param == "f=keepalive")
    })
}

pub fn receipts_keep_alive_url() -> String {
    format!("{RECEIPTS_AJAX_URL}?f=keepalive&r={}", rand::random::<u64>())
}
