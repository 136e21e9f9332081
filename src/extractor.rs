use log::{debug, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::record::JobRecord;

const DEADLINE_LABEL: &str = "Limite de dépôt :";
const LAST_CHANCE_HEADER: &str = "dernière chance pour postuler";

/// Everything the driver needs from one listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub records: Vec<JobRecord>,
    pub has_next_page: bool,
}

pub struct Extractor {
    item: Selector,
    item_link: Selector,
    item_title: Selector,
    card_title: Selector,
    card_text: Selector,
    card_footer: Selector,
    card_message: Selector,
    image: Selector,
    deadline_icon: Selector,
    posts_icon: Selector,
    next_page: Selector,
    whitespace: Regex,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Extractor {
            item: selector("div.s-item"),
            item_link: selector("a.card"),
            // Listing cards use h2, the home page "last chance" cards use h3
            item_title: selector("h2.card-title"),
            card_title: selector("h3.card-title"),
            card_text: selector("div.card-text"),
            card_footer: selector("div.card-footer"),
            card_message: selector("div.card-msg"),
            image: selector("img"),
            deadline_icon: selector("i.icon-time-out"),
            posts_icon: selector("i.icon-suitcase"),
            next_page: selector("a.page-link.next"),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Extracts the job records of one listing page, in document order.
    pub fn extract(&self, html: &str, base_url: &str) -> Vec<JobRecord> {
        self.parse_listing(html, base_url).records
    }

    pub fn parse_listing(&self, html: &str, base_url: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let records = document
            .select(&self.item)
            .enumerate()
            .map(|(index, item)| self.extract_item(item, index, base_url))
            .collect();

        ListingPage {
            records,
            has_next_page: document.select(&self.next_page).next().is_some(),
        }
    }

    fn extract_item(&self, item: ElementRef, index: usize, base_url: &str) -> JobRecord {
        let mut record = JobRecord::default();

        match item.select(&self.item_link).next() {
            Some(link) => match link.value().attr("href") {
                Some(href) => record.set_link(base_url, href),
                None => debug!("Item {} has a detail link without href", index),
            },
            None => debug!("Item {} has no detail link", index),
        }

        if let Some(title) = self.first_text(item, &self.item_title) {
            record.title = title;
        }
        if let Some(organization) = self.first_text(item, &self.card_text) {
            record.organization = organization;
        }
        self.read_footer(item, &mut record);

        record
    }

    /// Extracts the cards of the "Dernière chance pour postuler" section of the home page.
    ///
    /// Cards without an id are dropped here since nothing downstream filters them.
    pub fn extract_last_chance(&self, html: &str, base_url: &str) -> Vec<JobRecord> {
        let document = Html::parse_document(html);

        let Some(header) = document.tree.root().descendants().find(|node| match node.value() {
            Node::Text(text) => {
                let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
                !matches!(parent, Some("script" | "style" | "title" | "noscript"))
                    && text.to_lowercase().contains(LAST_CHANCE_HEADER)
            }
            _ => false,
        }) else {
            warn!("Could not find the 'Last Chance' section.");
            return Vec::new();
        };

        let Some(section) = header
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "section")
        else {
            warn!("Could not find the section wrapper.");
            return Vec::new();
        };

        section
            .select(&self.item_link)
            .filter_map(|card| {
                let record = self.extract_card(card, base_url);
                if record.id.is_none() {
                    debug!("Dropping last chance card without id: {}", record.short_title());
                    return None;
                }
                Some(record)
            })
            .collect()
    }

    fn extract_card(&self, card: ElementRef, base_url: &str) -> JobRecord {
        let mut record = JobRecord::default();

        if let Some(href) = card.value().attr("href") {
            record.set_link(base_url, href);
        }
        if let Some(title) = self.first_text(card, &self.card_title) {
            record.title = title;
        }
        if let Some(organization) = self.first_text(card, &self.card_text) {
            record.organization = organization;
        }
        record.image_url = card
            .select(&self.image)
            .next()
            .and_then(|image| image.value().attr("src"))
            .filter(|src| !src.is_empty())
            .map(|src| format!("{}{}", base_url.trim_end_matches('/'), src));
        record.urgency_message = self.first_text(card, &self.card_message);
        self.read_footer(card, &mut record);

        record
    }

    fn read_footer(&self, container: ElementRef, record: &mut JobRecord) {
        let Some(footer) = container.select(&self.card_footer).next() else {
            return;
        };

        record.deadline = self
            .icon_label(footer, &self.deadline_icon)
            .map(|text| text.replace(DEADLINE_LABEL, "").trim().to_string())
            .filter(|text| !text.is_empty());
        record.posts_count = self.icon_label(footer, &self.posts_icon);
    }

    /// Text of the element wrapping an icon, e.g. `<span><i class="icon-suitcase"></i> 3 postes</span>`.
    fn icon_label(&self, footer: ElementRef, icon: &Selector) -> Option<String> {
        let icon = footer.select(icon).next()?;
        let parent = icon.parent().and_then(ElementRef::wrap)?;
        Some(self.clean_text(parent)).filter(|text| !text.is_empty())
    }

    fn first_text(&self, container: ElementRef, selector: &Selector) -> Option<String> {
        container
            .select(selector)
            .next()
            .map(|element| self.clean_text(element))
            .filter(|text| !text.is_empty())
    }

    fn clean_text(&self, element: ElementRef) -> String {
        let text = element.text().collect::<String>().replace('\u{a0}', " ");
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.emploi-public.ma";

    const LISTING: &str = r#"
        <html><body>
          <div class="row">
            <div class="s-item">
              <a class="card" href="/fr/concours/detail/ingenieur-etat-2026">
                <div class="card-body">
                  <h2 class="card-title">
                    Concours de recrutement
                    d'ingénieurs d'État
                  </h2>
                  <div class="card-text"> Ministère de la Santé </div>
                </div>
                <div class="card-footer">
                  <span><i class="icon-suitcase"></i> 12 postes</span>
                  <span><i class="icon-time-out"></i> Limite de dépôt&nbsp;: 18 Janvier 2026 - 16h</span>
                </div>
              </a>
            </div>
            <div class="s-item">
              <div class="card">
                <div class="card-footer">
                  <span><i class="icon-time-out"></i> Limite de dépôt : 20 Janvier 2026</span>
                </div>
              </div>
            </div>
          </div>
          <ul class="pagination">
            <li><a class="page-link next" href="?page=2">Suivant</a></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn extracts_listing_items_in_order() {
        let page = Extractor::new().parse_listing(LISTING, BASE);
        assert_eq!(page.records.len(), 2);
        assert!(page.has_next_page);

        let first = &page.records[0];
        assert_eq!(first.id.as_deref(), Some("ingenieur-etat-2026"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.emploi-public.ma/fr/concours/detail/ingenieur-etat-2026")
        );
        assert_eq!(first.title, "Concours de recrutement d'ingénieurs d'État");
        assert_eq!(first.organization, "Ministère de la Santé");
        assert_eq!(first.posts_count.as_deref(), Some("12 postes"));
        assert_eq!(first.deadline.as_deref(), Some("18 Janvier 2026 - 16h"));
        assert_eq!(first.deadline_date, None);
    }

    #[test]
    fn malformed_item_falls_back_to_sentinels() {
        let records = Extractor::new().extract(LISTING, BASE);
        let second = &records[1];
        assert_eq!(second.id, None);
        assert_eq!(second.url, None);
        assert_eq!(second.title, "No Title");
        assert_eq!(second.organization, "Unknown");
        assert_eq!(second.posts_count, None);
        assert_eq!(second.deadline.as_deref(), Some("20 Janvier 2026"));
    }

    #[test]
    fn link_without_href_keeps_record() {
        let html = r#"<div class="s-item"><a class="card"><h2 class="card-title">Sans lien</h2></a></div>"#;
        let records = Extractor::new().extract(html, BASE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, None);
        assert_eq!(records[0].title, "Sans lien");
    }

    #[test]
    fn document_without_items_is_empty() {
        let page = Extractor::new().parse_listing("<html><body><p>Aucun résultat</p></body></html>", BASE);
        assert!(page.records.is_empty());
        assert!(!page.has_next_page);
    }

    #[test]
    fn disabled_next_link_is_not_next_page() {
        let html = r#"<div class="s-item"><a class="card" href="/x/1"></a></div>
                      <a class="page-link prev" href="?page=1">Précédent</a>"#;
        let page = Extractor::new().parse_listing(html, BASE);
        assert_eq!(page.records.len(), 1);
        assert!(!page.has_next_page);
    }

    const HOME: &str = r#"
        <html><body>
          <section class="latest">
            <h2>Derniers concours</h2>
            <a class="card" href="/fr/concours/detail/not-last-chance"></a>
          </section>
          <section class="last-chance">
            <div class="container">
              <h2 class="section-title">Dernière chance pour postuler</h2>
              <div class="cards">
                <a class="card" href="/fr/concours/detail/technicien-3">
                  <img src="/uploads/logo-3.png" alt="">
                  <h3 class="card-title">Technicien 3ème grade</h3>
                  <div class="card-text">Commune de Rabat</div>
                  <div class="card-msg">Plus que 2 jours</div>
                  <div class="card-footer">
                    <span><i class="icon-suitcase"></i> 3 postes</span>
                    <span><i class="icon-time-out"></i> Limite de dépôt : 1er Mars 2026</span>
                  </div>
                </a>
                <a class="card">
                  <h3 class="card-title">Sans identifiant</h3>
                </a>
              </div>
            </div>
          </section>
        </body></html>
    "#;

    #[test]
    fn extracts_last_chance_section_only() {
        let records = Extractor::new().extract_last_chance(HOME, BASE);
        assert_eq!(records.len(), 1);

        let card = &records[0];
        assert_eq!(card.id.as_deref(), Some("technicien-3"));
        assert_eq!(card.title, "Technicien 3ème grade");
        assert_eq!(card.organization, "Commune de Rabat");
        assert_eq!(
            card.image_url.as_deref(),
            Some("https://www.emploi-public.ma/uploads/logo-3.png")
        );
        assert_eq!(card.urgency_message.as_deref(), Some("Plus que 2 jours"));
        assert_eq!(card.posts_count.as_deref(), Some("3 postes"));
        assert_eq!(card.deadline.as_deref(), Some("1er Mars 2026"));
    }

    #[test]
    fn last_chance_header_ignores_page_title_and_scripts() {
        let html = r#"
            <html>
              <head><title>Emploi public | Dernière chance pour postuler</title></head>
              <body>
                <section class="latest">
                  <script>var banner = "Dernière chance pour postuler";</script>
                  <a class="card" href="/fr/concours/detail/not-last-chance"></a>
                </section>
                <section class="last-chance">
                  <h2>Dernière chance pour postuler</h2>
                  <a class="card" href="/fr/concours/detail/technicien-3"></a>
                </section>
              </body>
            </html>
        "#;
        let records = Extractor::new().extract_last_chance(html, BASE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("technicien-3"));
    }

    #[test]
    fn missing_last_chance_section_is_empty() {
        let html = r#"<section><a class="card" href="/x/1"></a></section>"#;
        assert!(Extractor::new().extract_last_chance(html, BASE).is_empty());

        let no_section = r#"<div><h2>Dernière chance pour postuler</h2><a class="card" href="/x/1"></a></div>"#;
        assert!(Extractor::new().extract_last_chance(no_section, BASE).is_empty());
    }
}
