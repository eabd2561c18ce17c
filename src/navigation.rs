//! The top bar on wide screens and the bottom tab bar on phones.

use maud::{Markup, html};

use crate::endpoints;

/// A navigation entry. At most one link per bar has `is_current` set.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_desktop_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!( a href=(self.url) class=(style) { (self.title) } )
    }

    fn into_mobile_html(self) -> Markup {
        let style = if self.is_current {
            "flex w-full min-w-0 items-center justify-center rounded-lg \
            bg-blue-50 px-2.5 py-2 text-xs font-semibold leading-tight \
            text-blue-700 shadow-sm sm:px-4 sm:text-sm \
            dark:bg-blue-900/30 dark:text-blue-200"
        } else {
            "flex w-full min-w-0 items-center justify-center rounded-lg \
            px-2.5 py-2 text-xs font-semibold leading-tight text-gray-600 \
            sm:px-4 sm:text-sm \
            hover:bg-blue-50/70 hover:text-blue-700 dark:text-gray-300 \
            dark:hover:bg-blue-900/20 dark:hover:text-blue-200"
        };

        html!(
            a
                href=(self.url)
                class=(style)
                aria-current=[self.is_current.then_some("page")]
            {
                span class="truncate" { (self.title) }
            }
        )
    }
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// The links for every section, highlighting the one at `active_endpoint`.
    ///
    /// Pages below a section, such as the new expense page, highlight nothing.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let link = |url, title| Link {
            url,
            title,
            is_current: active_endpoint == url,
        };

        let links = vec![
            link(endpoints::DASHBOARD_VIEW, "Dashboard"),
            link(endpoints::EXPENSES_VIEW, "Expenses"),
            link(endpoints::CATEGORIES_VIEW, "Categories"),
            link(endpoints::MONTHLY_REPORT_VIEW, "Reports"),
            Link {
                url: endpoints::LOG_OUT,
                title: "Log out",
                is_current: false,
            },
        ];

        NavBar { links }
    }

    pub fn into_html(self) -> Markup {
        let links = self.links;

        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href="/"
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Expense Tracker"
                        }
                    }

                    div class="hidden w-full lg:block lg:w-auto"
                    {
                        ul
                            class="font-medium flex flex-col p-4 lg:p-0 mt-4
                            border border-gray-100 rounded bg-gray-50
                            lg:flex-row lg:space-x-8 rtl:space-x-reverse lg:mt-0
                            lg:border-0 lg:bg-white dark:bg-gray-800
                            lg:dark:bg-gray-900 dark:border-gray-700"
                        {
                            @for link in links.clone() {
                                li { (link.into_desktop_html()) }
                            }
                        }
                    }
                }
            }

            nav class="fixed inset-x-0 bottom-0 z-40 lg:hidden"
            {
                div class="mx-auto max-w-screen-xl px-4 pb-4"
                {
                    div
                        class="rounded-xl border border-gray-200 bg-white/95
                        shadow-lg backdrop-blur dark:border-gray-700 dark:bg-gray-900/95"
                    {
                        ul
                            class="grid grid-cols-5 gap-2 px-4 py-3 text-xs font-semibold
                            text-gray-600 dark:text-gray-300"
                            aria-label="Primary"
                        {
                            @for link in links {
                                li class="min-w-0" { (link.into_mobile_html()) }
                            }
                        }
                    }
                }
            }
        )
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use scraper::{Html, Selector};

    use crate::{endpoints, navigation::NavBar};

    fn current_links(active_endpoint: &str) -> Vec<String> {
        NavBar::new(active_endpoint)
            .links
            .iter()
            .filter(|link| link.is_current)
            .map(|link| link.title.to_owned())
            .collect()
    }

    #[test]
    fn highlights_section_for_its_page() {
        let cases = [
            (endpoints::DASHBOARD_VIEW, "Dashboard"),
            (endpoints::EXPENSES_VIEW, "Expenses"),
            (endpoints::CATEGORIES_VIEW, "Categories"),
            (endpoints::MONTHLY_REPORT_VIEW, "Reports"),
        ];

        for (endpoint, want_title) in cases {
            assert_eq!(current_links(endpoint), [want_title], "page {endpoint}");
        }
    }

    #[test]
    fn highlights_nothing_for_other_pages() {
        let endpoints = [
            endpoints::ROOT,
            endpoints::NEW_EXPENSE_VIEW,
            endpoints::EDIT_EXPENSE_VIEW,
            endpoints::NEW_CATEGORY_VIEW,
            endpoints::INTERNAL_ERROR_VIEW,
            endpoints::LOG_IN_VIEW,
            endpoints::LOG_OUT,
            endpoints::REGISTER_VIEW,
            endpoints::EXPENSES_API,
        ];

        for endpoint in endpoints {
            assert!(current_links(endpoint).is_empty(), "page {endpoint}");
        }
    }

    #[test]
    fn renders_every_link_twice() {
        let markup = NavBar::new(endpoints::DASHBOARD_VIEW).into_html().into_string();
        let html = Html::parse_fragment(&markup);
        let selector =
            Selector::parse(&format!("a[href=\"{}\"]", endpoints::MONTHLY_REPORT_VIEW)).unwrap();

        assert_eq!(html.select(&selector).count(), 2);
    }

    #[test]
    fn marks_current_page_for_screen_readers() {
        let markup = NavBar::new(endpoints::EXPENSES_VIEW).into_html().into_string();
        let html = Html::parse_fragment(&markup);
        let selector = Selector::parse("a[aria-current=page]").unwrap();

        let hrefs = html
            .select(&selector)
            .map(|link| link.value().attr("href").unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(hrefs, vec![endpoints::EXPENSES_VIEW]);
    }
}
